use std::borrow::Cow;
use std::fmt;

use apollo_compiler::ast;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::ClientError;

/// A GraphQL operation document as authored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    source: Cow<'static, str>,
}

impl Document {
    #[must_use]
    pub fn new(source: impl Into<Cow<'static, str>>) -> Self {
        Self {
            source: source.into(),
        }
    }

    /// The document text exactly as it was given.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Canonical textual form sent over the wire, printed from the parsed
    /// tree on a single line.
    ///
    /// # Errors
    /// Returns `ClientError::BuildError` if the text is not valid GraphQL
    /// or declares no operation.
    pub fn print(&self) -> Result<String, ClientError> {
        let parsed = ast::Document::parse(self.source(), "operation.graphql")
            .map_err(|invalid| {
                ClientError::BuildError(format!("Invalid GraphQL document: {}", invalid.errors))
            })?;

        let has_operation = parsed
            .definitions
            .iter()
            .any(|def| matches!(def, ast::Definition::OperationDefinition(_)));
        if !has_operation {
            return Err(ClientError::BuildError(
                "GraphQL document declares no operation".into(),
            ));
        }

        Ok(parsed.serialize().no_indent().to_string())
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl From<&'static str> for Document {
    fn from(source: &'static str) -> Self {
        Self::new(source)
    }
}

impl From<String> for Document {
    fn from(source: String) -> Self {
        Self::new(source)
    }
}

/// A typed GraphQL operation: the document plus the shapes of its
/// variables and result data.
pub trait Operation {
    type Variables: Serialize + Send + Sync;
    type Data: DeserializeOwned;

    /// Operation name as declared in the document.
    const NAME: &'static str;
    const QUERY: &'static str;

    #[must_use]
    fn document() -> Document {
        Document::new(Self::QUERY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_print_is_single_line_without_comments() {
        let doc = Document::new(
            r"
            # storefront collections
            query Collections($options: CollectionListOptions) {
                collections(options: $options) {
                    items { id, name }
                }
            }
            ",
        );
        let printed = doc.print().unwrap();
        assert!(printed.starts_with("query Collections("));
        assert!(!printed.contains('\n'));
        assert!(!printed.contains("storefront collections"));
    }

    #[test]
    fn test_print_ignores_layout() {
        let spaced = Document::new("query Q {\n  a,\n  b # trailing\n}\n");
        let compact = Document::new("query Q{a b}");
        assert_eq!(spaced.print().unwrap(), compact.print().unwrap());
    }

    #[test]
    fn test_print_keeps_string_values() {
        let doc = Document::new(
            "mutation { logIn(username: \"a  b, # c\", password: \"pw\") { id } }",
        );
        let printed = doc.print().unwrap();
        assert!(printed.contains("\"a  b, # c\""));
        assert!(printed.contains("\"pw\""));
    }

    #[test]
    fn test_print_is_stable() {
        let once = Document::new("query Q { a { ...F } } fragment F on A { b }")
            .print()
            .unwrap();
        assert_eq!(Document::new(once.clone()).print().unwrap(), once);
    }

    #[test]
    fn test_print_rejects_syntax_errors() {
        let err = Document::new("query { foo( ").print().unwrap_err();
        assert!(matches!(err, ClientError::BuildError(_)));
    }

    #[test]
    fn test_print_rejects_documents_without_operation() {
        let err = Document::new("type Query { a: Int }").print().unwrap_err();
        assert!(matches!(err, ClientError::BuildError(_)));
    }
}
