use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BotError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    #[error("Telegram API error ({status}): {description}")]
    TelegramApi {
        status: reqwest::StatusCode,
        description: String,
    },

    #[error("OpenRouter API error ({status}): {message}")]
    OpenRouterApi {
        status: reqwest::StatusCode,
        message: String,
    },

    #[error("OpenRouter response error: {0}")]
    OpenRouterResponse(String),

    #[error("HTTP request error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    #[error("Image decoding error: {0}")]
    ImageDecode(String),
}

impl From<data_url::DataUrlError> for BotError {
    fn from(err: data_url::DataUrlError) -> Self {
        BotError::ImageDecode(format!("{err:?}"))
    }
}

impl From<data_url::forgiving_base64::InvalidBase64> for BotError {
    fn from(err: data_url::forgiving_base64::InvalidBase64) -> Self {
        BotError::ImageDecode(format!("{err:?}"))
    }
}

impl From<base64::DecodeError> for BotError {
    fn from(err: base64::DecodeError) -> Self {
        BotError::ImageDecode(err.to_string())
    }
}

impl BotError {
    /// Returns a user-facing explanation of the error, without internal details
    /// such as raw API bodies. Completes a sentence that starts with "Sorry, ...:".
    pub fn user_message(&self) -> String {
        match self {
            BotError::Config(_) | BotError::EnvVar(_) => {
                "there's a configuration issue on my end. Please contact the bot administrator.".to_string()
            }
            BotError::TelegramApi { .. } => {
                "I'm having trouble communicating with Telegram right now. Please try again later.".to_string()
            }
            BotError::OpenRouterApi { status, .. } => match *status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    "I'm having authentication issues with my AI service. Please contact the bot administrator.".to_string()
                }
                StatusCode::TOO_MANY_REQUESTS => {
                    "I've hit my rate limit. Please try again in a few moments.".to_string()
                }
                status if status.is_server_error() => {
                    "the AI service is experiencing issues right now. Please try again later.".to_string()
                }
                status if status.is_client_error() => {
                    "there was an issue with my request to the AI service. Please try again.".to_string()
                }
                _ => "I'm having trouble connecting to my AI service. Please try again later.".to_string(),
            },
            BotError::OpenRouterResponse(reason) => {
                format!("I received an unexpected response from my AI service ({reason}). Please try again.")
            }
            BotError::Reqwest(_) | BotError::Url(_) => {
                "I'm having network issues. Please try again in a moment.".to_string()
            }
            BotError::Json(_) => {
                "I couldn't understand my AI service's reply. Please try again.".to_string()
            }
            BotError::ImageDecode(_) => {
                "I couldn't read the image my AI service produced. Please try again.".to_string()
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, BotError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn api_error(status: StatusCode) -> BotError {
        BotError::OpenRouterApi {
            status,
            message: r#"{"error":{"message":"upstream said no"}}"#.to_string(),
        }
    }

    #[test]
    fn rate_limit_gets_friendly_message() {
        let message = api_error(StatusCode::TOO_MANY_REQUESTS).user_message();
        assert!(message.contains("rate limit"));
        assert!(!message.contains("upstream said no"));
    }

    #[test]
    fn auth_failures_point_to_administrator() {
        for status in [StatusCode::UNAUTHORIZED, StatusCode::FORBIDDEN] {
            assert!(api_error(status).user_message().contains("authentication"));
        }
    }

    #[test]
    fn server_errors_are_reported_as_service_issues() {
        let message = api_error(StatusCode::BAD_GATEWAY).user_message();
        assert!(message.contains("experiencing issues"));
    }

    #[test]
    fn unexpected_response_keeps_its_reason() {
        let message = BotError::OpenRouterResponse("no choices".to_string()).user_message();
        assert!(message.contains("no choices"));
    }

    #[test]
    fn decode_failure_hides_details() {
        let message = BotError::ImageDecode("Invalid symbol 33".to_string()).user_message();
        assert!(message.contains("couldn't read the image"));
        assert!(!message.contains("symbol"));
    }
}
