//! Upload attachment bytes ahead of the post that references them.

use super::api::*;
use super::channel::ChannelId;
use super::error::MattermostError;
use reqwest::multipart;
use serde::{Deserialize, Serialize};

/// Every attachment reaches Mattermost under this name; callers post rendered
/// cell output, not files with meaningful names.
const UPLOAD_FILENAME: &str = "upload.png";

/// The identifier minted by the upload, consumed immediately by the post
/// payload and never stored.
#[derive(Clone, Serialize, Deserialize)]
pub struct FileId(pub String);

/// <https://api.mattermost.com/#tag/files/operation/UploadFile>
#[derive(Deserialize)]
struct UploadResponse {
    file_infos: Vec<FileInfo>,
}

#[derive(Deserialize)]
struct FileInfo {
    id: FileId,
}

impl MattermostClient {
    /// Upload PNG bytes scoped to a channel. Mattermost wants the channel id
    /// inside the multipart form, alongside the file part itself.
    pub(crate) async fn upload_png(
        &self,
        channel_id: &ChannelId,
        bytes: Vec<u8>,
    ) -> Result<FileId, MattermostError> {
        let part = multipart::Part::bytes(bytes)
            .file_name(UPLOAD_FILENAME)
            .mime_str("image/png")?;
        let form = multipart::Form::new()
            .text("channel_id", channel_id.0.clone())
            .part("files", part);

        let res = self.post("/files").multipart(form).send().await?;
        let upload: UploadResponse = decode(res).await?;

        upload
            .file_infos
            .into_iter()
            .next()
            .map(|info| info.id)
            .ok_or(MattermostError::Api {
                status: reqwest::StatusCode::OK,
                detail: "upload returned no file info".into(),
            })
    }
}
