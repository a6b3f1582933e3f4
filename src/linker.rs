//! Attachment-to-message linking
//!
//! Attachments only know the file they came from. Once every file has been parsed
//! the linker backfills each attachment's `message_id` from the message sharing
//! its `email_id`, flags messages that ended up with attachments, and drops
//! attachments a file listed twice under the same name.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info};

use crate::models::{AttachmentRecord, MessageRecord};

/// Link the complete attachment set to the complete message set.
///
/// A message is flagged when its file has at least one attachment, so two
/// messages sharing an `email_id` are both flagged. Attachments take the
/// `message_id` of the first of them. A message whose `message_id` is `None` is
/// never flagged: a missing key cannot match.
#[must_use]
pub fn link(
    mut messages: Vec<MessageRecord>,
    mut attachments: Vec<AttachmentRecord>,
) -> (Vec<MessageRecord>, Vec<AttachmentRecord>) {
    if attachments.is_empty() {
        for message in &mut messages {
            message.with_attachment = Some(false);
        }
        info!(messages = messages.len(), "No attachments to link");
        return (messages, attachments);
    }

    // Flags follow the full join: every message of a file with attachments is linked.
    let files_with_attachments: HashSet<&str> =
        attachments.iter().map(|a| a.email_id.as_str()).collect();
    let linked_ids: HashSet<String> = messages
        .iter()
        .filter(|m| files_with_attachments.contains(m.email_id.as_str()))
        .filter_map(|m| m.message_id.clone())
        .collect();
    for message in &mut messages {
        let flag = message
            .message_id
            .as_deref()
            .is_some_and(|id| linked_ids.contains(id));
        message.with_attachment = Some(flag);
    }

    // Backfill keeps the first message per file, the row that survives dedup.
    let mut parents: HashMap<&str, Option<&str>> = HashMap::with_capacity(messages.len());
    for message in &messages {
        parents
            .entry(message.email_id.as_str())
            .or_insert(message.message_id.as_deref());
    }

    let mut orphans = 0usize;
    for attachment in &mut attachments {
        match parents.get(attachment.email_id.as_str()) {
            Some(parent) => attachment.message_id = parent.map(str::to_string),
            None => {
                attachment.message_id = None;
                orphans += 1;
            }
        }
    }
    if orphans > 0 {
        debug!(orphans, "Attachments without a parent message");
    }

    let before = attachments.len();
    let attachments = dedup_attachments(attachments);
    info!(
        messages = messages.len(),
        attachments = attachments.len(),
        duplicates_dropped = before - attachments.len(),
        "Linked attachments to messages"
    );

    (messages, attachments)
}

/// Keep the first attachment for every `(email_id, attachment_name)` pair.
#[must_use]
pub fn dedup_attachments(attachments: Vec<AttachmentRecord>) -> Vec<AttachmentRecord> {
    let mut seen: HashSet<(String, String)> = HashSet::with_capacity(attachments.len());
    attachments
        .into_iter()
        .filter(|a| seen.insert((a.email_id.clone(), a.attachment_name.clone())))
        .collect()
}
