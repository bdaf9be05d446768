//! Virtual-path resolution against the backup list of a user.
//!
//! A virtual path has the shape `{source}/{snapshot}/{relative path}`
//! where the snapshot and relative-path segments are optional. Backups
//! are matched in catalog order and the first match wins; overlapping
//! sources resolve by catalog ordering, not by longest prefix.

use cellar_catalog::Backup;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedBackup {
    pub source: String,
    pub snapshot: String,
    pub path: String,
    pub backup_id: i64,
}

/// Split `path` into source, snapshot and relative path against the
/// first backup whose source is a path-segment prefix of it. `None`
/// means no backup matched.
pub fn split_path(path: &str, backups: &[Backup]) -> Option<ResolvedBackup> {
    for backup in backups {
        let rel = if path == backup.source {
            ""
        } else {
            match path
                .strip_prefix(&backup.source)
                .and_then(|rest| rest.strip_prefix('/'))
            {
                Some(rest) => rest,
                None => continue,
            }
        };
        let (snapshot, rel_path) = match rel.split_once('/') {
            Some((snapshot, rel_path)) => (snapshot, rel_path),
            None => (rel, ""),
        };
        return Some(ResolvedBackup {
            source: backup.source.clone(),
            snapshot: snapshot.to_string(),
            path: rel_path.to_string(),
            backup_id: backup.id,
        });
    }
    None
}

/// Path split into segments; the root `/` is the one-element list of
/// the empty segment, so every absolute source has it as a prefix.
fn segments(path: &str) -> Vec<&str> {
    if path == "/" {
        vec![""]
    } else {
        path.split('/').collect()
    }
}

fn is_segment_prefix(prefix: &[&str], full: &[&str]) -> bool {
    prefix.len() <= full.len() && prefix.iter().zip(full).all(|(a, b)| a == b)
}

/// Whether `path` is a strict ancestor of at least one backup source.
pub fn is_parent_of_backup(path: &str, backups: &[Backup]) -> bool {
    let path_segments = segments(path);
    backups.iter().any(|backup| {
        let source_segments = segments(&backup.source);
        source_segments.len() > path_segments.len()
            && is_segment_prefix(&path_segments, &source_segments)
    })
}

/// Child paths of `path` on the way down to backup sources, one per
/// distinct next segment, de-duplicated, in backup-list order.
pub fn backup_children(path: &str, backups: &[Backup]) -> Vec<String> {
    let path_segments = segments(path);
    let mut seen = std::collections::HashSet::new();
    let mut children = Vec::new();
    for backup in backups {
        let source_segments = segments(&backup.source);
        if source_segments.len() > path_segments.len()
            && is_segment_prefix(&path_segments, &source_segments)
        {
            let base = source_segments[path_segments.len()];
            let child = if path == "/" {
                format!("/{base}")
            } else {
                format!("{path}/{base}")
            };
            if seen.insert(child.clone()) {
                children.push(child);
            }
        }
    }
    children
}

#[cfg(test)]
mod tests {
    use super::*;
    use cellar_catalog::Group;

    fn backup(id: i64, source: &str) -> Backup {
        Backup {
            id,
            group: Group {
                id: 1,
                name: "cernbox".to_string(),
            },
            repository: format!("repo-{id}"),
            username: "gdelmont".to_string(),
            name: format!("backup-{id}"),
            source: source.to_string(),
        }
    }

    #[test]
    fn test_split_full_path() {
        let backups = [backup(1, "/eos/home-g/gdelmont")];
        let resolved = split_path("/eos/home-g/gdelmont/snap1/docs/report.txt", &backups).unwrap();
        assert_eq!(resolved.source, "/eos/home-g/gdelmont");
        assert_eq!(resolved.snapshot, "snap1");
        assert_eq!(resolved.path, "docs/report.txt");
        assert_eq!(resolved.backup_id, 1);
    }

    #[test]
    fn test_split_exact_source() {
        let backups = [backup(1, "/eos/home-g/gdelmont")];
        let resolved = split_path("/eos/home-g/gdelmont", &backups).unwrap();
        assert_eq!(resolved.snapshot, "");
        assert_eq!(resolved.path, "");
        assert_eq!(resolved.backup_id, 1);
    }

    #[test]
    fn test_split_snapshot_only() {
        let backups = [backup(1, "/eos/home-g/gdelmont")];
        let resolved = split_path("/eos/home-g/gdelmont/snap1", &backups).unwrap();
        assert_eq!(resolved.snapshot, "snap1");
        assert_eq!(resolved.path, "");
    }

    #[test]
    fn test_first_match_wins_over_longer_prefix() {
        // Overlapping sources resolve by list order, not specificity.
        let backups = [backup(1, "/a/b"), backup(2, "/a/b/c")];
        let resolved = split_path("/a/b/c/snap1/x", &backups).unwrap();
        assert_eq!(resolved.backup_id, 1);
        assert_eq!(resolved.source, "/a/b");
        assert_eq!(resolved.snapshot, "c");
        assert_eq!(resolved.path, "snap1/x");
    }

    #[test]
    fn test_segment_prefix_not_byte_prefix() {
        let backups = [backup(1, "/eos/home")];
        assert!(split_path("/eos/homework", &backups).is_none());
        assert!(split_path("/eos/home/snap1", &backups).is_some());
    }

    #[test]
    fn test_no_match() {
        let backups = [backup(1, "/eos/home-g/gdelmont")];
        assert!(split_path("/cephfs/data", &backups).is_none());
    }

    #[test]
    fn test_parent_of_backup() {
        let backups = [backup(1, "/eos/home-g/gdelmont")];
        assert!(is_parent_of_backup("/", &backups));
        assert!(is_parent_of_backup("/eos", &backups));
        assert!(is_parent_of_backup("/eos/home-g", &backups));
        // The source itself is not a strict ancestor.
        assert!(!is_parent_of_backup("/eos/home-g/gdelmont", &backups));
        assert!(!is_parent_of_backup("/cephfs", &backups));
    }

    #[test]
    fn test_prefix_of_source_does_not_split() {
        let backups = [backup(1, "/eos/home-g/gdelmont")];
        assert!(split_path("/eos/home-g", &backups).is_none());
        assert!(is_parent_of_backup("/eos/home-g", &backups));
    }

    #[test]
    fn test_children_of_root() {
        let backups = [
            backup(1, "/eos/home-g/gdelmont"),
            backup(2, "/eos/home-a/alice"),
        ];
        assert_eq!(backup_children("/", &backups), vec!["/eos".to_string()]);
    }

    #[test]
    fn test_children_dedup_and_order() {
        let backups = [
            backup(1, "/eos/home-g/gdelmont"),
            backup(2, "/eos/home-a/alice"),
            backup(3, "/cephfs/project"),
        ];
        assert_eq!(
            backup_children("/eos", &backups),
            vec!["/eos/home-g".to_string(), "/eos/home-a".to_string()]
        );
        assert_eq!(backup_children("/cephfs", &backups), vec!["/cephfs/project"]);
        assert!(backup_children("/eos/home-g/gdelmont", &backups).is_empty());
    }
}
