use super::unquote_path;
use gitpane_core::domain::TreeEntry;

/// `ls-tree -r --long <sha>`: `mode type object size<TAB>path`.
pub fn parse_tree(output: &str) -> Vec<TreeEntry> {
    output.lines().filter_map(parse_tree_line).collect()
}

fn parse_tree_line(line: &str) -> Option<TreeEntry> {
    let (meta, path) = line.split_once('\t')?;
    if path.is_empty() {
        return None;
    }
    let mut parts = meta.split_whitespace();
    let mode = parts.next()?;
    let kind = parts.next()?;
    let object = parts.next()?;
    let size = parts.next().and_then(|s| s.parse::<u64>().ok());
    Some(TreeEntry {
        mode: mode.to_string(),
        kind: kind.to_string(),
        object: object.to_string(),
        size,
        path: unquote_path(path),
    })
}
