use crate::dispatcher::{HandlerError, HandlerRequest, HandlerResponse, ValidationError};

/// `GET /users/{id}` - echo the id back as raw text.
///
/// The id must parse as a non-negative integer; anything else is a
/// validation failure and becomes `400 {"error":"invalid id"}`.
pub fn handle(req: &HandlerRequest) -> Result<HandlerResponse, HandlerError> {
    let raw = req
        .get_path_param("id")
        .ok_or_else(|| ValidationError::new("invalid id"))?;
    let id: u32 = raw
        .parse()
        .map_err(|_| ValidationError::new("invalid id"))?;
    Ok(HandlerResponse::text(200, format!("User ID is {id}")))
}
