use utoipa::OpenApi;

use crate::routes::chat::ChatApi;
use crate::routes::health::HealthApi;

#[derive(OpenApi)]
#[openapi(info(
    title = "chatrelay-server",
    description = "Chat relay for hosted LLM predictions",
    version = "0.1.0",
    contact(name = "chatrelay", url = "https://github.com/Cyberhan123/chatrelay")
))]
pub struct ApiDoc;

pub fn get_docs() -> utoipa::openapi::OpenApi {
    let mut root = ApiDoc::openapi();
    root.merge(ChatApi::openapi());
    root.merge(HealthApi::openapi());
    root
}
