use anyhow::Context;
use aws_config::{defaults, BehaviorVersion};
use aws_credential_types::Credentials;
use aws_sdk_s3::{
    config::{Builder as S3ConfigBuilder, Region},
    Client,
};
use aws_smithy_types::byte_stream::ByteStream;
use axum::async_trait;
use bytes::Bytes;
use tracing::debug;
use uuid::Uuid;

use crate::config::FileHostConfig;

/// Logical folder every résumé is stored under.
pub const RESUME_FOLDER: &str = "Job_Seekers_Resume";

/// Result of a successful upload: the handle to delete it later and the URL to fetch it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub public_id: String,
    pub secure_url: String,
}

#[async_trait]
pub trait FileHost: Send + Sync {
    async fn upload(&self, body: Bytes, content_type: &str, folder: &str)
        -> anyhow::Result<UploadedFile>;
    async fn destroy(&self, public_id: &str) -> anyhow::Result<()>;
}

#[derive(Clone)]
pub struct S3FileHost {
    client: Client,
    bucket: String,
    public_url: String,
}

impl S3FileHost {
    pub async fn new(cfg: &FileHostConfig) -> anyhow::Result<Self> {
        let shared = defaults(BehaviorVersion::latest())
            .region(Region::new(cfg.region.clone()))
            .credentials_provider(Credentials::new(
                &cfg.access_key,
                &cfg.secret_key,
                None,
                None,
                "static",
            ))
            .endpoint_url(&cfg.endpoint)
            .load()
            .await;

        let conf = S3ConfigBuilder::from(&shared)
            .endpoint_url(&cfg.endpoint)
            .force_path_style(true)
            .build();

        Ok(Self {
            client: Client::from_conf(conf),
            bucket: cfg.bucket.clone(),
            public_url: cfg.public_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl FileHost for S3FileHost {
    async fn upload(
        &self,
        body: Bytes,
        content_type: &str,
        folder: &str,
    ) -> anyhow::Result<UploadedFile> {
        let public_id = object_key(folder, content_type);
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&public_id)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .context("s3 put_object")?;
        debug!(%public_id, "file uploaded");

        Ok(UploadedFile {
            secure_url: format!("{}/{}", self.public_url, public_id),
            public_id,
        })
    }

    async fn destroy(&self, public_id: &str) -> anyhow::Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(public_id)
            .send()
            .await
            .context("s3 delete_object")?;
        debug!(%public_id, "file destroyed");
        Ok(())
    }
}

fn object_key(folder: &str, content_type: &str) -> String {
    let ext = ext_from_mime(content_type).unwrap_or("bin");
    format!("{}/{}.{}", folder, Uuid::new_v4(), ext)
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "application/pdf" => Some("pdf"),
        "application/msword" => Some("doc"),
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => Some("docx"),
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

#[cfg(test)]
pub mod fake {
    use super::*;
    use std::sync::Mutex;

    /// In-process file host that records calls and can be told to fail.
    #[derive(Default)]
    pub struct FakeFileHost {
        pub fail_uploads: bool,
        pub empty_response: bool,
        pub fail_destroys: bool,
        pub uploaded: Mutex<Vec<String>>,
        pub destroyed: Mutex<Vec<String>>,
    }

    impl FakeFileHost {
        pub fn failing() -> Self {
            Self {
                fail_uploads: true,
                ..Default::default()
            }
        }

        pub fn uploads(&self) -> Vec<String> {
            self.uploaded.lock().unwrap().clone()
        }

        pub fn destroys(&self) -> Vec<String> {
            self.destroyed.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl FileHost for FakeFileHost {
        async fn upload(
            &self,
            _body: Bytes,
            content_type: &str,
            folder: &str,
        ) -> anyhow::Result<UploadedFile> {
            if self.fail_uploads {
                anyhow::bail!("file host unavailable");
            }
            if self.empty_response {
                return Ok(UploadedFile {
                    public_id: String::new(),
                    secure_url: String::new(),
                });
            }
            let public_id = object_key(folder, content_type);
            self.uploaded.lock().unwrap().push(public_id.clone());
            Ok(UploadedFile {
                secure_url: format!("https://files.local/{}", public_id),
                public_id,
            })
        }

        async fn destroy(&self, public_id: &str) -> anyhow::Result<()> {
            if self.fail_destroys {
                anyhow::bail!("file host refused delete of {}", public_id);
            }
            self.destroyed.lock().unwrap().push(public_id.to_string());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ext_from_mime() {
        assert_eq!(ext_from_mime("application/pdf"), Some("pdf"));
        assert_eq!(ext_from_mime("application/msword"), Some("doc"));
        assert_eq!(
            ext_from_mime("application/vnd.openxmlformats-officedocument.wordprocessingml.document"),
            Some("docx")
        );
        assert_eq!(ext_from_mime("image/jpg"), Some("jpg"));
        assert_eq!(ext_from_mime("whatever/else"), None);
    }

    #[test]
    fn object_key_lives_under_folder() {
        let key = object_key(RESUME_FOLDER, "application/pdf");
        assert!(key.starts_with("Job_Seekers_Resume/"));
        assert!(key.ends_with(".pdf"));

        let unknown = object_key("misc", "text/x-unknown");
        assert!(unknown.ends_with(".bin"));
    }
}
