//! Shared plumbing for backends driven by an OpenDAL operator.

use futures::TryStreamExt;
use opendal::{EntryMode, ErrorKind, Operator};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::sync::Arc;

use assetstore_common::{Error, Result};

use crate::listing::ListingEntry;

/// Builds an operator bound to the named bucket or container.
///
/// Providers call it once for their configured container and again for
/// one-off container overrides. Tests substitute OpenDAL's memory service.
pub type OperatorFactory = Arc<dyn Fn(&str) -> Result<Operator> + Send + Sync>;

/// Characters escaped inside a URL path segment.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// What was being attempted when OpenDAL failed.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Action {
    Read,
    Write,
    Delete,
    List,
}

/// Map an OpenDAL error onto the provider error taxonomy.
pub(crate) fn map_error(err: opendal::Error, action: Action, target: &str) -> Error {
    match err.kind() {
        ErrorKind::NotFound => Error::NotFound(target.to_string()),
        ErrorKind::PermissionDenied | ErrorKind::ConfigInvalid => {
            Error::Connection(format!("Access to {} rejected: {}", target, err))
        }
        _ => match action {
            Action::Read => Error::Read(format!("Failed to read {}: {}", target, err)),
            Action::Write | Action::Delete => {
                Error::Write(format!("Failed to modify {}: {}", target, err))
            }
            Action::List => Error::Connection(format!("Failed to list {}: {}", target, err)),
        },
    }
}

/// OpenDAL addresses the operator root as `/`.
fn list_path(scope: &str) -> &str {
    if scope.is_empty() {
        "/"
    } else {
        scope
    }
}

/// Collect the listing under `scope` in the order the service returns it.
pub(crate) async fn list_entries(
    op: &Operator,
    scope: &str,
    recursive: bool,
) -> Result<Vec<ListingEntry>> {
    let path = list_path(scope);
    let mut lister = op
        .lister_with(path)
        .recursive(recursive)
        .await
        .map_err(|e| map_error(e, Action::List, path))?;

    let mut entries = Vec::new();
    while let Some(entry) = lister
        .try_next()
        .await
        .map_err(|e| map_error(e, Action::List, path))?
    {
        let meta = entry.metadata();
        let key = entry.path().to_string();
        if meta.mode() == EntryMode::DIR || key.ends_with('/') {
            entries.push(ListingEntry::directory(key));
        } else {
            entries.push(ListingEntry::file(
                key,
                Some(meta.content_length()),
                meta.last_modified(),
            ));
        }
    }
    Ok(entries)
}

/// Round-trip probe used by `initialize()`: open a listing, pull one page.
pub(crate) async fn probe(op: &Operator, scope: &str) -> Result<()> {
    let path = list_path(scope);
    let mut lister = op
        .lister(path)
        .await
        .map_err(|e| map_error(e, Action::List, path))?;
    lister
        .try_next()
        .await
        .map_err(|e| map_error(e, Action::List, path))?;
    Ok(())
}

/// Delete an object, failing with `NotFound` when it does not exist.
///
/// Object store deletes are idempotent, so existence is checked first.
pub(crate) async fn delete_existing(op: &Operator, native: &str) -> Result<()> {
    op.stat(native)
        .await
        .map_err(|e| map_error(e, Action::Delete, native))?;
    op.delete(native)
        .await
        .map_err(|e| map_error(e, Action::Delete, native))
}

/// Percent-encode a native key for use in a URL path, keeping `/`.
pub(crate) fn encode_key(native: &str) -> String {
    native
        .split('/')
        .map(|segment| utf8_percent_encode(segment, SEGMENT).to_string())
        .collect::<Vec<_>>()
        .join("/")
}
