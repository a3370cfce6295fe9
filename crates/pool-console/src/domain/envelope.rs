use serde::{Deserialize, Serialize};

/// Uniform result wrapper returned by pool operations.
///
/// Serialized as `{"result": "success", "data": ...}` or
/// `{"result": "failure", "error": ...}`; consumers branch on `result`. Some
/// operations report their failure payload under `data` instead, see
/// [`Failure`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "lowercase")]
pub enum Envelope<T, E> {
    Success { data: T },
    Failure(Failure<E>),
}

/// Failure payload together with the key it is reported under.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Failure<E> {
    Error { error: E },
    Data { data: E },
}

impl<E> Failure<E> {
    pub fn into_inner(self) -> E {
        match self {
            Self::Error { error } => error,
            Self::Data { data } => data,
        }
    }
}

impl<T, E> Envelope<T, E> {
    pub fn success(data: T) -> Self {
        Self::Success { data }
    }

    /// Failure reported under `error`.
    pub fn failure(error: E) -> Self {
        Self::Failure(Failure::Error { error })
    }

    /// Failure reported under `data`.
    pub fn failure_in_data(data: E) -> Self {
        Self::Failure(Failure::Data { data })
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn into_result(self) -> Result<T, E> {
        match self {
            Self::Success { data } => Ok(data),
            Self::Failure(failure) => Err(failure.into_inner()),
        }
    }
}

#[cfg(test)]
mod tests {
    use {super::*, serde_json::json};

    #[test]
    fn wire_shape() {
        let success = Envelope::<_, String>::success(json!({"fee": "1000"}));
        assert_eq!(
            serde_json::to_value(&success).unwrap(),
            json!({"result": "success", "data": {"fee": "1000"}}),
        );

        let failure = Envelope::<u8, _>::failure("boom".to_string());
        assert_eq!(
            serde_json::to_value(&failure).unwrap(),
            json!({"result": "failure", "error": "boom"}),
        );

        let failure = Envelope::<u8, _>::failure_in_data("boom".to_string());
        assert_eq!(
            serde_json::to_value(&failure).unwrap(),
            json!({"result": "failure", "data": "boom"}),
        );
    }

    #[test]
    fn parses_failure() {
        let envelope: Envelope<u8, String> =
            serde_json::from_value(json!({"result": "failure", "error": "reverted"})).unwrap();
        assert!(!envelope.is_success());
        assert_eq!(envelope.into_result(), Err("reverted".to_string()));

        let envelope: Envelope<u8, String> =
            serde_json::from_value(json!({"result": "failure", "data": "reverted"})).unwrap();
        assert_eq!(envelope, Envelope::failure_in_data("reverted".to_string()));
    }
}
