use serde::{Deserialize, Serialize};

const C_TEMPLATE: &str =
    "#include <stdio.h>\n\nint main() {\n    // Your code here\n    return 0;\n}";

const PYTHON_TEMPLATE: &str =
    "def main():\n    # Your code here\n    pass\n\nif __name__ == \"__main__\":\n    main()";

const JAVA_TEMPLATE: &str =
    "public class Main {\n    public static void main(String[] args) {\n        // Your code here\n    }\n}";

/// Languages students can write their solutions in. The selection is
/// session-wide, not per question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Language {
    C,
    Python,
    Java,
}

impl Language {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::C => "c",
            Self::Python => "python",
            Self::Java => "java",
        }
    }

    /// Starter code shown for a question that has no saved draft yet.
    pub(crate) fn starter_template(self) -> &'static str {
        match self {
            Self::C => C_TEMPLATE,
            Self::Python => PYTHON_TEMPLATE,
            Self::Java => JAVA_TEMPLATE,
        }
    }

    /// Language identifier understood by the remote execution service.
    pub(crate) fn execution_id(self) -> &'static str {
        match self {
            Self::C => "c",
            Self::Python => "python3",
            Self::Java => "java",
        }
    }

    pub(crate) fn version_index(self) -> &'static str {
        match self {
            Self::C => "4",
            Self::Python => "4",
            Self::Java => "4",
        }
    }
}
