use super::types::Info;
use crate::codec;
use crate::dispatcher::{HandlerError, HandlerRequest, HandlerResponse};
use serde_json::Value;

/// `POST /users` - decode an [`Info`] from the body and confirm.
///
/// A missing body, malformed JSON or a missing `name` field all surface as
/// a `DecodeError`, which the dispatcher turns into a 400. The confirmation
/// is a JSON string, so it goes out quoted.
pub fn handle(req: &HandlerRequest) -> Result<HandlerResponse, HandlerError> {
    let info: Info = codec::decode(req.body.as_deref().unwrap_or_default())?;
    Ok(HandlerResponse::json(
        200,
        Value::String(format!("Received name: {}", info.name)),
    ))
}
