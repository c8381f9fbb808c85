use crate::dispatcher::{HandlerError, HandlerRequest, HandlerResponse};

/// `GET /` - fixed greeting, raw text body.
pub fn handle(_req: &HandlerRequest) -> Result<HandlerResponse, HandlerError> {
    Ok(HandlerResponse::text(200, "Hello World!"))
}
