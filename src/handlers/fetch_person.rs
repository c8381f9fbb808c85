use super::types::Person;
use crate::codec;
use crate::dispatcher::{HandlerError, HandlerRequest, HandlerResponse};

/// `GET /users` - a fixed Person, JSON-encoded. Pure and deterministic.
pub fn handle(_req: &HandlerRequest) -> Result<HandlerResponse, HandlerError> {
    let person = Person {
        name: "Good!".to_string(),
        age: "21".to_string(),
    };
    Ok(HandlerResponse::json(200, codec::to_value(&person)))
}
