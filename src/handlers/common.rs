use async_trait::async_trait;
use axum::{
    extract::{FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::errors::ServiceError;

/// JSON body that is deserialized and validated before the handler runs.
///
/// Malformed bodies and failed validation both surface as a `400` through
/// [`ServiceError`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ServiceError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        validate_input(&value)?;
        Ok(Self(value))
    }
}

/// Validate request input
pub fn validate_input<T: Validate>(input: &T) -> Result<(), ServiceError> {
    input
        .validate()
        .map_err(|e| ServiceError::ValidationError(format!("Validation failed: {}", e)))
}

/// Reject forecast horizons above the configured limit
pub fn validate_forecast_days(days: u32, max_days: u32) -> Result<(), ServiceError> {
    if days == 0 || days > max_days {
        return Err(ServiceError::ValidationError(format!(
            "forecast_days must be between 1 and {}",
            max_days
        )));
    }
    Ok(())
}

pub(crate) fn default_forecast_days() -> u32 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, Validate)]
    struct Named {
        #[validate(length(min = 1))]
        name: String,
    }

    fn json_request(body: &'static str) -> Request {
        axum::http::Request::builder()
            .method("POST")
            .uri("/")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn accepts_valid_body() {
        let ValidatedJson(named) =
            ValidatedJson::<Named>::from_request(json_request(r#"{"name":"a"}"#), &())
                .await
                .unwrap();
        assert_eq!(named.name, "a");
    }

    #[tokio::test]
    async fn rejects_invalid_body() {
        let err = ValidatedJson::<Named>::from_request(json_request(r#"{"name":""}"#), &())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::ValidationError(_)));
    }

    #[tokio::test]
    async fn rejects_malformed_json() {
        let err = ValidatedJson::<Named>::from_request(json_request("{"), &())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::BadRequest(_)));
    }

    #[test]
    fn forecast_days_bounds() {
        assert!(validate_forecast_days(1, 365).is_ok());
        assert!(validate_forecast_days(365, 365).is_ok());
        assert!(validate_forecast_days(0, 365).is_err());
        assert!(validate_forecast_days(366, 365).is_err());
    }
}
