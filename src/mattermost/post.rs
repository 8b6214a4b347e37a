//! Create posts in any given Mattermost channel, resolving the target and
//! uploading the attachment along the way.

use super::api::*;
use super::channel::{ChannelId, ChannelTarget};
use super::error::MattermostError;
use super::file::FileId;
use serde::Serialize;

/// One post to relay, as assembled at the service boundary. The attachment,
/// if any, is already plain PNG bytes; figure rendering happens before the
/// relay core is involved.
pub struct PostRequest {
    pub target: ChannelTarget,
    pub message: String,
    pub attachment: Option<Vec<u8>>,
}

/// <https://api.mattermost.com/#tag/posts/operation/CreatePost>
#[derive(Serialize)]
struct CreatePostRequest<'a> {
    channel_id: &'a ChannelId,
    message: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    file_ids: Vec<FileId>,
}

impl MattermostClient {
    /// Relay one post: resolve the target, upload the attachment if present,
    /// create the post. A single linear sequence; the first failure aborts
    /// it, and an upload orphaned by a failed post call is left behind on the
    /// server.
    pub async fn post_message(&self, req: PostRequest) -> Result<(), MattermostError> {
        let me = self.current_user_id().await?;
        let channel_id = self.resolve_channel(&me, &req.target).await?;

        let file_ids = match req.attachment {
            Some(bytes) => vec![self.upload_png(&channel_id, bytes).await?],
            None => Vec::new(),
        };

        self.create_post(&channel_id, &req.message, file_ids).await
    }

    async fn create_post(
        &self,
        channel_id: &ChannelId,
        message: &str,
        file_ids: Vec<FileId>,
    ) -> Result<(), MattermostError> {
        let res = self
            .post("/posts")
            .json(&CreatePostRequest {
                channel_id,
                message,
                file_ids,
            })
            .send()
            .await?;
        accept(res).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_post_body_omits_empty_file_ids() {
        let body = CreatePostRequest {
            channel_id: &ChannelId("d1".into()),
            message: "hi",
            file_ids: Vec::new(),
        };

        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({"channel_id": "d1", "message": "hi"})
        );
    }

    #[test]
    fn test_create_post_body_includes_file_ids() {
        let body = CreatePostRequest {
            channel_id: &ChannelId("c1".into()),
            message: "Check out my plot",
            file_ids: vec![FileId("f1".into())],
        };

        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({
                "channel_id": "c1",
                "message": "Check out my plot",
                "file_ids": ["f1"]
            })
        );
    }
}
