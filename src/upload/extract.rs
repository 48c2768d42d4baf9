//! Placeholder resolution for outbound operation text.

use bytes::Bytes;
use log::info;
use serde_json::Value;
use thiserror::Error;

use super::{FILE_PLACEHOLDER_PREFIX, PendingUploads};

/// Errors raised while resolving attachment placeholders.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The outbound text is not a JSON document.
    #[error("outbound message is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// A placeholder refers to a blob that is not staged.
    #[error("File pointer missing for file upload: {placeholder}")]
    FilePointerMissing { placeholder: String },
}

/// Operation text ready for the frame codec.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Extracted {
    /// Text with placeholders rewritten to positional pointers.
    pub text: String,
    /// Blobs in pointer order.
    pub attachments: Vec<Bytes>,
}

/// Resolve attachment placeholders in `text` against `uploads`.
///
/// Only string values beneath `payload.variables` are inspected. Each
/// resolved placeholder is rewritten to `#__graphql_file__:<n>`, where `n`
/// numbers the resolved placeholders in document order, and its blob is
/// removed from `uploads`. When nothing is resolved the text is returned
/// unchanged.
///
/// # Errors
///
/// Returns [`ExtractError::Json`] when `text` is not JSON and
/// [`ExtractError::FilePointerMissing`] when a placeholder has no staged
/// blob. On error every blob claimed so far is put back.
///
/// # Examples
///
/// ```
/// use bytes::Bytes;
/// use peerframe::upload::{PendingUploads, extract};
///
/// let uploads = PendingUploads::new();
/// let token = uploads.insert("abc", Bytes::from_static(b"blobA"));
/// let text = format!(r#"{{"type":"start","payload":{{"variables":{{"file":"{token}"}}}}}}"#);
///
/// let extracted = extract(&text, &uploads).expect("placeholder resolves");
/// assert_eq!(
///     extracted.text,
///     r##"{"type":"start","payload":{"variables":{"file":"#__graphql_file__:0"}}}"##
/// );
/// assert_eq!(extracted.attachments, vec![Bytes::from_static(b"blobA")]);
/// assert!(uploads.is_empty());
/// ```
pub fn extract(text: &str, uploads: &PendingUploads) -> Result<Extracted, ExtractError> {
    let mut document: Value = serde_json::from_str(text)?;
    let Some(variables) = document
        .get_mut("payload")
        .and_then(|payload| payload.get_mut("variables"))
    else {
        return Ok(unchanged(text));
    };

    let mut claimed = Vec::new();
    if let Err(err) = resolve(variables, uploads, &mut claimed) {
        uploads.restore(claimed);
        return Err(err);
    }
    if claimed.is_empty() {
        return Ok(unchanged(text));
    }

    let text = match serde_json::to_string(&document) {
        Ok(text) => text,
        Err(err) => {
            uploads.restore(claimed);
            return Err(err.into());
        }
    };
    info!(
        "uploading {} files, {} remain unsent",
        claimed.len(),
        uploads.len()
    );
    Ok(Extracted {
        text,
        attachments: claimed.into_iter().map(|(_, blob)| blob).collect(),
    })
}

fn unchanged(text: &str) -> Extracted {
    Extracted {
        text: text.to_owned(),
        attachments: Vec::new(),
    }
}

fn resolve(
    value: &mut Value,
    uploads: &PendingUploads,
    claimed: &mut Vec<(String, Bytes)>,
) -> Result<(), ExtractError> {
    match value {
        Value::String(s) => {
            let Some(id) = s.strip_prefix(FILE_PLACEHOLDER_PREFIX) else {
                return Ok(());
            };
            let id = id.to_owned();
            let blob = uploads
                .take(&id)
                .ok_or_else(|| ExtractError::FilePointerMissing {
                    placeholder: s.clone(),
                })?;
            *s = format!("{FILE_PLACEHOLDER_PREFIX}{}", claimed.len());
            claimed.push((id, blob));
            Ok(())
        }
        Value::Array(items) => items
            .iter_mut()
            .try_for_each(|item| resolve(item, uploads, claimed)),
        Value::Object(fields) => fields
            .values_mut()
            .try_for_each(|field| resolve(field, uploads, claimed)),
        Value::Null | Value::Bool(_) | Value::Number(_) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};

    use super::*;

    #[fixture]
    fn uploads() -> PendingUploads {
        let uploads = PendingUploads::new();
        uploads.insert("abc", Bytes::from_static(b"blobA"));
        uploads.insert("def", Bytes::from_static(b"blobB"));
        uploads
    }

    #[rstest]
    #[case::no_variables(r#"{"type":"connection_init","payload":{}}"#)]
    #[case::no_payload(r#"{"type":"ka"}"#)]
    #[case::spacing_kept(r#"{ "type": "op", "payload": { "variables": { "n": 1 } } }"#)]
    fn text_without_placeholders_is_byte_identical(uploads: PendingUploads, #[case] text: &str) {
        let extracted = extract(text, &uploads).expect("extract");
        assert_eq!(extracted.text, text);
        assert!(extracted.attachments.is_empty());
        assert_eq!(uploads.len(), 2);
    }

    #[rstest]
    fn placeholders_are_numbered_in_document_order(uploads: PendingUploads) {
        let text = concat!(
            r#"{"type":"start","payload":{"variables":{"#,
            r##""z":"#__graphql_file__:def","##,
            r##""list":[1,{"a":"#__graphql_file__:abc"}],"##,
            r#""plain":"keep"}},"id":"1"}"#,
        );

        let extracted = extract(text, &uploads).expect("extract");

        assert_eq!(
            extracted.text,
            concat!(
                r#"{"type":"start","payload":{"variables":{"#,
                r##""z":"#__graphql_file__:0","##,
                r##""list":[1,{"a":"#__graphql_file__:1"}],"##,
                r#""plain":"keep"}},"id":"1"}"#,
            )
        );
        assert_eq!(
            extracted.attachments,
            vec![Bytes::from_static(b"blobB"), Bytes::from_static(b"blobA")]
        );
        assert!(uploads.is_empty());
    }

    #[rstest]
    fn placeholders_outside_variables_are_left_alone(uploads: PendingUploads) {
        let text = r##"{"type":"op","payload":{"query":"#__graphql_file__:abc","variables":{}}}"##;
        let extracted = extract(text, &uploads).expect("extract");
        assert_eq!(extracted.text, text);
        assert!(uploads.contains("abc"));
    }

    #[rstest]
    fn second_resolution_of_a_placeholder_fails(uploads: PendingUploads) {
        let text = r##"{"payload":{"variables":{"file":"#__graphql_file__:abc"}}}"##;
        extract(text, &uploads).expect("first resolution");

        let err = extract(text, &uploads).expect_err("blob already consumed");
        assert!(matches!(
            err,
            ExtractError::FilePointerMissing { ref placeholder } if placeholder == "#__graphql_file__:abc"
        ));
    }

    #[rstest]
    fn failed_extraction_puts_claimed_blobs_back(uploads: PendingUploads) {
        let text = r##"{"payload":{"variables":{"a":"#__graphql_file__:abc","b":"#__graphql_file__:zzz"}}}"##;

        let err = extract(text, &uploads).expect_err("missing blob");

        assert_eq!(
            err.to_string(),
            "File pointer missing for file upload: #__graphql_file__:zzz"
        );
        assert!(uploads.contains("abc"));
        assert_eq!(uploads.len(), 2);
    }

    #[rstest]
    fn non_json_text_is_rejected(uploads: PendingUploads) {
        let err = extract("not json", &uploads).expect_err("invalid JSON");
        assert!(matches!(err, ExtractError::Json(_)));
    }
}
