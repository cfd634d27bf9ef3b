//! Participant label table and audio file matching.
//!
//! The label table is the roster: only recordings whose filename carries a
//! participant id present in the table are analyzed. Ids are read from the
//! `id` column of a CSV; audio files are matched by parsing the integer
//! before the first `_` (or, failing that, before the extension) in the
//! filename.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::error::ExtractError;
use crate::features::ParticipantId;

/// Recognized audio extensions, compared case-insensitively.
const AUDIO_EXTENSIONS: [&str; 5] = ["wav", "mp3", "m4a", "flac", "ogg"];

/// Load the participant id set from the `id` column of a label CSV.
///
/// Unlike per-file analysis failures, a missing or malformed label table is
/// fatal: without it there is nothing to match recordings against.
pub fn load_participant_ids(path: &Path) -> Result<BTreeSet<ParticipantId>, ExtractError> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| {
        ExtractError::Label(format!("cannot read label table {}: {e}", path.display()))
    })?;

    let headers = reader
        .headers()
        .map_err(|e| ExtractError::Label(format!("cannot read label header: {e}")))?;
    let id_column = headers
        .iter()
        .position(|h| h == "id")
        .ok_or_else(|| ExtractError::Label("label table has no `id` column".into()))?;

    let mut ids = BTreeSet::new();
    for record in reader.records() {
        let record =
            record.map_err(|e| ExtractError::Label(format!("bad label row: {e}")))?;
        let field = record.get(id_column).unwrap_or("").trim();
        let id: ParticipantId = field
            .parse()
            .map_err(|_| ExtractError::Label(format!("non-integer participant id {field:?}")))?;
        ids.insert(id);
    }

    if ids.is_empty() {
        return Err(ExtractError::Label(format!(
            "label table {} contains no participant ids",
            path.display()
        )));
    }

    tracing::info!(count = ids.len(), path = %path.display(), "loaded participant ids");
    Ok(ids)
}

/// Parse the participant id from an audio filename.
///
/// `1234_recording.wav` and `1234.wav` both yield 1234; anything without a
/// leading integer yields `None`.
pub fn participant_id_from_filename(name: &str) -> Option<ParticipantId> {
    let prefix = match name.split_once('_') {
        Some((before, _)) => before,
        None => name.split_once('.').map(|(before, _)| before)?,
    };
    prefix.parse().ok()
}

fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let e = e.to_ascii_lowercase();
            AUDIO_EXTENSIONS.contains(&e.as_str())
        })
        .unwrap_or(false)
}

/// Scan a directory for recordings belonging to known participants.
///
/// Returns one file per participant id. When several recordings share an
/// id, the lexicographically first filename wins, so repeated runs over
/// the same directory pick the same file.
pub fn match_audio_files(
    audio_dir: &Path,
    ids: &BTreeSet<ParticipantId>,
) -> Result<BTreeMap<ParticipantId, PathBuf>, ExtractError> {
    let mut names: Vec<PathBuf> = std::fs::read_dir(audio_dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && is_audio_file(p))
        .collect();
    names.sort();

    let mut matched = BTreeMap::new();
    for path in names {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(id) = participant_id_from_filename(name) else {
            tracing::debug!(file = name, "no participant id in filename, skipping");
            continue;
        };
        if ids.contains(&id) {
            matched.entry(id).or_insert(path);
        }
    }

    tracing::info!(
        matched = matched.len(),
        roster = ids.len(),
        dir = %audio_dir.display(),
        "matched audio files to participants"
    );
    Ok(matched)
}
