use crate::domain::FileCandidate;

/// Lyric formats the editor can open, highest priority first.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["ttml", "lrc", "eslrc", "qrc", "yrc", "lys"];

/// Picks the file to load from a request's changed files.
pub fn select_content_file(files: &[FileCandidate]) -> Option<&FileCandidate> {
    select_by_priority(files, SUPPORTED_EXTENSIONS)
}

/// Keeps files whose extension appears in `priority` and returns the one with
/// the lowest priority index. Equal extensions keep their original order.
pub fn select_by_priority<'a>(
    files: &'a [FileCandidate],
    priority: &[&str],
) -> Option<&'a FileCandidate> {
    let mut ranked: Vec<(usize, &FileCandidate)> = files
        .iter()
        .filter_map(|file| {
            let ext = file.extension()?;
            let rank = priority.iter().position(|candidate| *candidate == ext)?;
            Some((rank, file))
        })
        .collect();
    ranked.sort_by_key(|(rank, _)| *rank);
    ranked.into_iter().next().map(|(_, file)| file)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files(names: &[&str]) -> Vec<FileCandidate> {
        names
            .iter()
            .map(|name| FileCandidate {
                filename: (*name).to_owned(),
                raw_url: format!("https://raw.example/{name}"),
            })
            .collect()
    }

    #[test]
    fn highest_priority_extension_wins() {
        let files = files(&["a.txt", "b.ttml", "c.lrc"]);
        let picked = select_content_file(&files).expect("selection");
        assert_eq!(picked.filename, "b.ttml");
    }

    #[test]
    fn unsupported_files_select_nothing() {
        assert!(select_content_file(&files(&["a.txt"])).is_none());
        assert!(select_content_file(&[]).is_none());
    }

    #[test]
    fn ties_keep_list_order() {
        let files = files(&["z.yrc", "first.lrc", "second.lrc"]);
        let picked = select_content_file(&files).expect("selection");
        assert_eq!(picked.filename, "first.lrc");
    }

    #[test]
    fn extension_match_ignores_case() {
        let files = files(&["raw/Song.QRC", "notes.md"]);
        let picked = select_content_file(&files).expect("selection");
        assert_eq!(picked.filename, "raw/Song.QRC");
    }
}
