/// Form binding and validation
///
/// Post forms arrive as `multipart/form-data` (they may carry an image),
/// comment forms as urlencoded bodies. Validation never fails the request:
/// it produces per-field messages the views hand back to the client.
use crate::error::{AppError, Result};
use crate::models::{Group, Post};
use actix_multipart::Multipart;
use bytes::{Bytes, BytesMut};
use futures::TryStreamExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::Validate;

pub const REQUIRED: &str = "This field is required.";
pub const INVALID_CHOICE: &str =
    "Select a valid choice. That choice is not one of the available choices.";
pub const INVALID_IMAGE: &str =
    "Upload a valid image. The file you uploaded was either not an image or a corrupted image.";
pub const EMPTY_FILE: &str = "The submitted file is empty.";
pub const CONTRADICTORY_IMAGE: &str =
    "Please either submit a file or check the clear checkbox, not both.";

/// Upper bound for a single uploaded image
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Upper bound for a url-encoded form body (2.5 MiB)
pub const MAX_FORM_BYTES: usize = 2_621_440;

/// Field name -> messages, in field order
pub type FieldErrors = BTreeMap<String, Vec<String>>;

fn add_error(errors: &mut FieldErrors, field: &str, message: impl Into<String>) {
    errors
        .entry(field.to_string())
        .or_default()
        .push(message.into());
}

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub data: Bytes,
}

/// Raw post form as submitted, before validation
#[derive(Debug, Clone, Default)]
pub struct PostSubmission {
    pub text: String,
    pub group: Option<String>,
    pub image: Option<UploadedFile>,
    pub clear_image: bool,
}

impl PostSubmission {
    /// Drain a multipart body into its known fields; unknown fields are ignored
    pub async fn from_multipart(mut payload: Multipart) -> Result<Self> {
        let mut submission = PostSubmission::default();

        while let Some(mut field) = payload
            .try_next()
            .await
            .map_err(|e| AppError::BadRequest(format!("invalid multipart body: {}", e)))?
        {
            let name = field.name().unwrap_or_default().to_string();
            let file_name = field
                .content_disposition()
                .and_then(|cd| cd.get_filename())
                .map(str::to_string);

            let mut data = BytesMut::new();
            while let Some(chunk) = field
                .try_next()
                .await
                .map_err(|e| AppError::BadRequest(format!("invalid multipart field: {}", e)))?
            {
                data.extend_from_slice(&chunk);
                if data.len() > MAX_UPLOAD_BYTES {
                    return Err(AppError::BadRequest(format!(
                        "field '{}' exceeds {} bytes",
                        name, MAX_UPLOAD_BYTES
                    )));
                }
            }

            match name.as_str() {
                "text" => submission.text = String::from_utf8_lossy(&data).into_owned(),
                "group" => submission.group = Some(String::from_utf8_lossy(&data).into_owned()),
                "image-clear" => submission.clear_image = !data.is_empty(),
                "image" => {
                    // Browsers send an empty, unnamed part when no file was picked
                    let file_name = file_name.unwrap_or_default();
                    if !file_name.is_empty() || !data.is_empty() {
                        submission.image = Some(UploadedFile {
                            file_name,
                            data: data.freeze(),
                        });
                    }
                }
                _ => {}
            }
        }

        Ok(submission)
    }
}

/// What an accepted form does to the post image
#[derive(Debug, Clone)]
pub enum ImageChange {
    Keep,
    Clear,
    Replace(UploadedFile),
}

/// A post form that passed validation
#[derive(Debug, Clone)]
pub struct CleanPost {
    pub text: String,
    pub group_id: Option<i64>,
    pub image: ImageChange,
}

#[derive(Debug, Validate)]
struct PostFields {
    #[validate(length(min = 1, message = "This field is required."))]
    text: String,
}

/// Validate a submission against the current group choices
pub fn clean_post(
    submission: &PostSubmission,
    groups: &[Group],
) -> std::result::Result<CleanPost, FieldErrors> {
    let mut errors = FieldErrors::new();

    let fields = PostFields {
        text: submission.text.trim().to_string(),
    };
    if let Err(validation) = fields.validate() {
        for (field, field_errors) in validation.field_errors() {
            for err in field_errors.iter() {
                let message = err
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| err.code.to_string());
                add_error(&mut errors, &field.to_string(), message);
            }
        }
    }

    let group_id = match submission.group.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => match raw.parse::<i64>() {
            Ok(id) if groups.iter().any(|g| g.id == id) => Some(id),
            _ => {
                add_error(&mut errors, "group", INVALID_CHOICE);
                None
            }
        },
    };

    let image = match (&submission.image, submission.clear_image) {
        (Some(_), true) => {
            add_error(&mut errors, "image", CONTRADICTORY_IMAGE);
            ImageChange::Keep
        }
        (Some(upload), false) => match check_image(upload) {
            Ok(()) => ImageChange::Replace(upload.clone()),
            Err(message) => {
                add_error(&mut errors, "image", message);
                ImageChange::Keep
            }
        },
        (None, true) => ImageChange::Clear,
        (None, false) => ImageChange::Keep,
    };

    if errors.is_empty() {
        Ok(CleanPost {
            text: fields.text,
            group_id,
            image,
        })
    } else {
        Err(errors)
    }
}

fn check_image(upload: &UploadedFile) -> std::result::Result<(), &'static str> {
    if upload.data.is_empty() {
        return Err(EMPTY_FILE);
    }
    image::guess_format(&upload.data)
        .map(|_| ())
        .map_err(|_| INVALID_IMAGE)
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupChoice {
    pub id: i64,
    pub title: String,
}

/// Post form as handed to the client: current values, errors and choices
#[derive(Debug, Clone, Serialize)]
pub struct PostFormView {
    pub text: String,
    pub group: Option<String>,
    pub image: Option<String>,
    pub groups: Vec<GroupChoice>,
    pub errors: FieldErrors,
}

impl PostFormView {
    fn choices(groups: &[Group]) -> Vec<GroupChoice> {
        groups
            .iter()
            .map(|g| GroupChoice {
                id: g.id,
                title: g.to_string(),
            })
            .collect()
    }

    pub fn empty(groups: &[Group]) -> Self {
        Self {
            text: String::new(),
            group: None,
            image: None,
            groups: Self::choices(groups),
            errors: FieldErrors::new(),
        }
    }

    /// Form pre-filled from an existing post
    pub fn for_post(post: &Post, groups: &[Group]) -> Self {
        Self {
            text: post.text.clone(),
            group: post.group_id.map(|id| id.to_string()),
            image: post.image.clone(),
            groups: Self::choices(groups),
            errors: FieldErrors::new(),
        }
    }

    /// Re-render a rejected submission; the stored image (if any) stays shown
    pub fn rejected(
        submission: &PostSubmission,
        current_image: Option<String>,
        groups: &[Group],
        errors: FieldErrors,
    ) -> Self {
        Self {
            text: submission.text.clone(),
            group: submission.group.clone(),
            image: current_image,
            groups: Self::choices(groups),
            errors,
        }
    }
}

/// Comment form body
#[derive(Debug, Default, Deserialize, Validate)]
pub struct CommentForm {
    #[serde(default)]
    #[validate(length(min = 1, message = "This field is required."))]
    pub text: String,
}

impl CommentForm {
    /// Trimmed text if the form is valid
    pub fn clean(mut self) -> Option<String> {
        self.text = self.text.trim().to_string();
        self.validate().ok().map(|_| self.text)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CommentFormView {
    pub text: String,
    pub errors: FieldErrors,
}
