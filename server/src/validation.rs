use crate::error::ApiError;

/// Validate the synthesis parameters shared by both service variants.
///
/// Speaker tags are deliberately not checked against the reference lists;
/// mismatches there are the model's problem and surface as synthesis errors.
pub fn validate_generate_request(
    text_list: &[String],
    temperature: f32,
    topk: i64,
) -> Result<(), ApiError> {
    if text_list.is_empty() {
        return Err(ApiError::InvalidInput(
            "text_list cannot be empty".to_string(),
        ));
    }
    for (index, text) in text_list.iter().enumerate() {
        if text.trim().is_empty() {
            return Err(ApiError::InvalidInput(format!(
                "text_list[{index}] is empty"
            )));
        }
    }

    if temperature.is_nan() || temperature <= 0.0 {
        return Err(ApiError::InvalidInput(format!(
            "temperature must be positive, got {temperature}"
        )));
    }
    if topk <= 0 {
        return Err(ApiError::InvalidInput(format!(
            "topk must be positive, got {topk}"
        )));
    }

    Ok(())
}
