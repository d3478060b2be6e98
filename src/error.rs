//! Error types for the CFO copilot

use thiserror::Error;

/// Result type alias for copilot operations
pub type Result<T> = std::result::Result<T, CopilotError>;

#[derive(Error, Debug)]
pub enum CopilotError {

    // =============================
    // Data Errors
    // =============================

    #[error("Schema error: {file} is missing required column '{column}'")]
    Schema { file: String, column: String },

    #[error("Parse error: {file} line {line}, column '{column}': cannot parse '{value}'")]
    Parse {
        file: String,
        line: usize,
        column: String,
        value: String,
    },

    #[error("Missing FX rate: no rate_to_usd for {currency} in {period}")]
    MissingFxRate { currency: String, period: String },

    #[error("No data: {0}")]
    NoData(String),

    // =============================
    // Pipeline Errors
    // =============================

    #[error("Unknown intent: {0}")]
    UnknownIntent(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Export error: {0}")]
    Export(String),

    #[error("Configuration error: {0}")]
    Config(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Example questions offered when a question cannot be classified
pub const EXAMPLE_QUESTIONS: &[&str] = &[
    "What was June 2025 revenue vs budget in USD?",
    "Show Gross Margin % trend for the last 3 months.",
    "Break down Opex by category for June 2025.",
    "What was EBITDA for 2025-06?",
    "What is our cash runway right now?",
];

impl CopilotError {
    /// Whether the error comes from the input data rather than the question
    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            CopilotError::Schema { .. }
                | CopilotError::Parse { .. }
                | CopilotError::MissingFxRate { .. }
                | CopilotError::NoData(_)
                | CopilotError::Csv(_)
        )
    }

    /// Text shown to the user in place of an answer
    pub fn user_message(&self) -> String {
        match self {
            CopilotError::UnknownIntent(_) => {
                let mut msg = String::from(
                    "Sorry, I couldn't tell which metric you meant. I can answer questions like:",
                );
                for example in EXAMPLE_QUESTIONS {
                    msg.push_str("\n- ");
                    msg.push_str(example);
                }
                msg
            }
            CopilotError::MissingFxRate { currency, period } => format!(
                "I can't convert {} amounts for {}: fx.csv has no rate_to_usd for that period.",
                currency, period
            ),
            CopilotError::InvalidInput(detail) => format!("I couldn't use that question: {}", detail),
            other => format!("I couldn't answer that: {}", other),
        }
    }
}
