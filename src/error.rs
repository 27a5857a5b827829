use aws_sdk_s3::error::SdkError;
use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid webhook payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("Invalid base64 data: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Google AI API error ({status}): {message}")]
    GoogleApi { status: StatusCode, message: String },

    #[error("Google AI response error: {0}")]
    GoogleResponse(String),

    #[error("LINE API error ({status}): {message}")]
    LineApi { status: StatusCode, message: String },

    #[error("S3 error: {0}")]
    S3(Box<aws_sdk_s3::Error>),

    #[error("HTTP request error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Job queue for user {0} is full")]
    QueueFull(String),
}

impl<E, R> From<SdkError<E, R>> for RelayError
where
    aws_sdk_s3::Error: From<SdkError<E, R>>,
{
    fn from(err: SdkError<E, R>) -> Self {
        RelayError::S3(Box::new(err.into()))
    }
}

impl RelayError {
    /// Returns a user-facing message in Japanese, suitable for pushing to LINE
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            RelayError::Config(_) | RelayError::EnvVar(_) => {
                "ボットの設定に問題があります。管理者に連絡してください。".to_string()
            }
            RelayError::Io(_) | RelayError::Payload(_) | RelayError::Base64(_) => {
                "データの処理中に問題が発生しました。もう一度お試しください。".to_string()
            }
            RelayError::GoogleApi { status, .. } => match *status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    "画像生成サービスの認証に失敗しました。管理者に連絡してください。".to_string()
                }
                StatusCode::TOO_MANY_REQUESTS => {
                    "リクエストが多すぎます。少し時間をおいてからお試しください。".to_string()
                }
                status if status.is_server_error() => {
                    "画像生成サービスで障害が発生しています。しばらくしてからお試しください。"
                        .to_string()
                }
                status if status.is_client_error() => {
                    "画像生成リクエストが受け付けられませんでした。内容を変えてお試しください。"
                        .to_string()
                }
                _ => "画像生成サービスに接続できませんでした。しばらくしてからお試しください。"
                    .to_string(),
            },
            RelayError::GoogleResponse(_) => {
                "画像を生成できませんでした。別の内容でお試しください。".to_string()
            }
            RelayError::LineApi { .. } => {
                "メッセージの送受信に失敗しました。もう一度お試しください。".to_string()
            }
            RelayError::S3(_) => {
                "画像のアップロードに失敗しました。もう一度お試しください。".to_string()
            }
            RelayError::Reqwest(_) => {
                "ネットワークエラーが発生しました。しばらくしてからお試しください。".to_string()
            }
            RelayError::QueueFull(_) => {
                "処理中のリクエストが多すぎます。完了するまでお待ちください。".to_string()
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, RelayError>;
