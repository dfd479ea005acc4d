use validator::Validate;

use crate::api::errors::ApiError;

pub(crate) fn check_payload(payload: &impl Validate) -> Result<(), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemas::session::EnterExamRequest;

    #[test]
    fn empty_fields_are_reported_with_messages() {
        let payload =
            EnterExamRequest { student_name: String::new(), register_number: String::new() };
        let result = check_payload(&payload);
        let Err(ApiError::BadRequest(message)) = result else {
            panic!("expected a bad request error");
        };
        assert!(message.contains("student_name must not be empty"), "message: {message}");
        assert!(message.contains("register_number must not be empty"), "message: {message}");
    }

    #[test]
    fn valid_payload_passes() {
        let payload = EnterExamRequest {
            student_name: "Student".to_string(),
            register_number: "R-1".to_string(),
        };
        assert!(check_payload(&payload).is_ok());
    }
}
