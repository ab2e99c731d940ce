use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use fusion_contracts::{FusionError, FusionResult, ImageFile};

/// Reads the whole file as `data:<mime>;base64,<content>`.
pub fn data_uri(file: &ImageFile) -> FusionResult<String> {
    let bytes = file
        .read_bytes()
        .map_err(|err| FusionError::encoding(format!("File could not be read: {err:#}")))?;
    Ok(format!(
        "data:{};base64,{}",
        file.mime_type(),
        BASE64.encode(bytes)
    ))
}

/// Base64 content of the file with the data-URI prefix removed.
pub fn encode_payload(file: &ImageFile) -> FusionResult<String> {
    payload_from_data_uri(&data_uri(file)?)
}

/// Everything after the first comma; an empty remainder is an error.
pub fn payload_from_data_uri(uri: &str) -> FusionResult<String> {
    match uri.split_once(',') {
        Some((_, payload)) if !payload.is_empty() => Ok(payload.to_string()),
        _ => Err(FusionError::encoding(
            "Failed to extract base64 string from file.",
        )),
    }
}
