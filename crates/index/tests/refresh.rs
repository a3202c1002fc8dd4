use pb_index::{IndexError, PbIndex, STATE_DIR_NAME};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};
use tempfile::tempdir;

fn pb_text(unit: &str, num_votes: usize) -> String {
    let mut text = format!(
        "META\nkey;value\ncountry;Poland\nunit;{unit}\ninstance;2024\nbudget;100000\n\
         PROJECTS\nproject_id;cost\n1;40000\n2;60000\nVOTES\nvoter_id;vote\n"
    );
    for i in 0..num_votes {
        text.push_str(&format!("{i};1,2\n"));
    }
    text
}

fn write_pb(dir: &Path, name: &str, unit: &str, num_votes: usize, mtime_ms: u64) {
    let path = dir.join(name);
    fs::write(&path, pb_text(unit, num_votes)).unwrap();
    set_mtime(&path, mtime_ms);
}

fn set_mtime(path: &Path, mtime_ms: u64) {
    let file = fs::File::options().write(true).open(path).unwrap();
    file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_millis(mtime_ms))
        .unwrap();
}

#[tokio::test]
async fn first_refresh_builds_then_second_is_noop() {
    let temp = tempdir().unwrap();
    write_pb(temp.path(), "katowice.pb", "Katowice", 5, 1_000_000);
    write_pb(temp.path(), "krakow.pb", "Krakow", 3, 1_000_000);

    let index = PbIndex::open(temp.path()).await.unwrap();
    let report = index.refresh(false).await.unwrap();
    assert_eq!(report.added, 2);
    assert_eq!(report.parsed, 2);
    assert!(report.errors.is_empty());
    assert_eq!(index.snapshot().num_current(), 2);

    let second = index.refresh(false).await.unwrap();
    assert!(second.is_noop());
    assert_eq!(second.parsed, 0);
}

#[tokio::test]
async fn unicode_and_spaced_file_names_are_indexed() {
    let temp = tempdir().unwrap();
    write_pb(temp.path(), "poland_kraków_2024.pb", "Kraków", 5, 1_000_000);
    write_pb(temp.path(), "new york 2021.pb", "New York", 3, 1_000_000);

    let index = PbIndex::open(temp.path()).await.unwrap();
    let report = index.refresh(false).await.unwrap();
    assert_eq!(report.added, 2);
    assert!(report.errors.is_empty());
    assert_eq!(index.snapshot().num_current(), 2);
    assert!(index.get_tile("poland_kraków_2024.pb").is_ok());
    assert!(index
        .read_source("new york 2021.pb")
        .await
        .unwrap()
        .starts_with("META"));
}

#[tokio::test]
async fn changed_file_is_the_only_one_reparsed() {
    let temp = tempdir().unwrap();
    write_pb(temp.path(), "katowice.pb", "Katowice", 5, 1_000_000);
    write_pb(temp.path(), "krakow.pb", "Krakow", 3, 1_000_000);

    let index = PbIndex::open(temp.path()).await.unwrap();
    index.refresh(false).await.unwrap();

    write_pb(temp.path(), "krakow.pb", "Krakow", 7, 2_000_000);

    let report = index.refresh(false).await.unwrap();
    assert_eq!(report.parsed, 1);
    assert_eq!(report.updated, 1);
    assert_eq!(report.added, 0);

    let tile = index.get_tile("krakow.pb").unwrap();
    assert_eq!(tile.num_votes, 7);
}

#[tokio::test]
async fn full_refresh_reparses_everything() {
    let temp = tempdir().unwrap();
    write_pb(temp.path(), "katowice.pb", "Katowice", 5, 1_000_000);
    write_pb(temp.path(), "krakow.pb", "Krakow", 3, 1_000_000);

    let index = PbIndex::open(temp.path()).await.unwrap();
    index.refresh(false).await.unwrap();

    let report = index.refresh(true).await.unwrap();
    assert_eq!(report.parsed, 2);
    assert_eq!(report.updated, 2);
}

#[tokio::test]
async fn newer_version_supersedes_older_in_same_group() {
    let temp = tempdir().unwrap();
    write_pb(temp.path(), "katowice_v1.pb", "Katowice", 5, 1_000_000);
    write_pb(temp.path(), "katowice_v2.pb", "Katowice", 9, 2_000_000);

    let index = PbIndex::open(temp.path()).await.unwrap();
    index.refresh(false).await.unwrap();

    let snapshot = index.snapshot();
    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot.num_current(), 1);
    assert!(snapshot.get("katowice_v2.pb").unwrap().is_current);
    assert!(!snapshot.get("katowice_v1.pb").unwrap().is_current);

    // Superseded tiles stay addressable by name.
    assert_eq!(index.get_tile("katowice_v1.pb").unwrap().num_votes, 5);
}

#[tokio::test]
async fn mtime_tie_resolves_by_file_name() {
    let temp = tempdir().unwrap();
    write_pb(temp.path(), "katowice_a.pb", "Katowice", 5, 1_000_000);
    write_pb(temp.path(), "katowice_b.pb", "Katowice", 5, 1_000_000);

    let index = PbIndex::open(temp.path()).await.unwrap();
    index.refresh(false).await.unwrap();

    let snapshot = index.snapshot();
    assert!(snapshot.get("katowice_b.pb").unwrap().is_current);
    assert!(!snapshot.get("katowice_a.pb").unwrap().is_current);
}

#[tokio::test]
async fn removing_current_file_promotes_previous_version() {
    let temp = tempdir().unwrap();
    write_pb(temp.path(), "katowice_v1.pb", "Katowice", 5, 1_000_000);
    write_pb(temp.path(), "katowice_v2.pb", "Katowice", 9, 2_000_000);

    let index = PbIndex::open(temp.path()).await.unwrap();
    index.refresh(false).await.unwrap();

    fs::remove_file(temp.path().join("katowice_v2.pb")).unwrap();

    let report = index.refresh(false).await.unwrap();
    assert_eq!(report.removed, 1);

    let snapshot = index.snapshot();
    assert_eq!(snapshot.len(), 1);
    assert!(snapshot.get("katowice_v1.pb").unwrap().is_current);
}

#[tokio::test]
async fn unparsable_file_is_reported_not_indexed() {
    let temp = tempdir().unwrap();
    write_pb(temp.path(), "katowice.pb", "Katowice", 5, 1_000_000);
    fs::write(temp.path().join("broken.pb"), b"no section keyword here\n").unwrap();

    let index = PbIndex::open(temp.path()).await.unwrap();
    let report = index.refresh(false).await.unwrap();

    assert_eq!(report.added, 1);
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].starts_with("broken.pb:"));
    assert!(matches!(
        index.get_tile("broken.pb"),
        Err(IndexError::UnknownFile(_))
    ));
}

#[tokio::test]
async fn index_persists_across_reopen() {
    let temp = tempdir().unwrap();
    write_pb(temp.path(), "katowice.pb", "Katowice", 5, 1_000_000);

    {
        let index = PbIndex::open(temp.path()).await.unwrap();
        index.refresh(false).await.unwrap();
    }

    let reopened = PbIndex::open(temp.path()).await.unwrap();
    // Tiles are served from the stored index before any refresh runs.
    assert_eq!(reopened.snapshot().num_current(), 1);
    assert_eq!(reopened.get_tile("katowice.pb").unwrap().num_votes, 5);

    let report = reopened.refresh(false).await.unwrap();
    assert_eq!(report.parsed, 0);
}

#[tokio::test]
async fn corrupt_store_is_rebuilt_from_files() {
    let temp = tempdir().unwrap();
    write_pb(temp.path(), "katowice.pb", "Katowice", 5, 1_000_000);

    {
        let index = PbIndex::open(temp.path()).await.unwrap();
        index.refresh(false).await.unwrap();
    }

    let store_path = temp.path().join(STATE_DIR_NAME).join("index.json");
    fs::write(&store_path, b"{ truncated").unwrap();

    let index = PbIndex::open(temp.path()).await.unwrap();
    assert!(index.snapshot().is_empty());

    let report = index.refresh(false).await.unwrap();
    assert_eq!(report.added, 1);
    assert_eq!(index.snapshot().num_current(), 1);
}

#[tokio::test]
async fn state_directory_is_not_indexed() {
    let temp = tempdir().unwrap();
    write_pb(temp.path(), "katowice.pb", "Katowice", 5, 1_000_000);

    let index = PbIndex::open(temp.path()).await.unwrap();
    index.refresh(false).await.unwrap();

    // A stray .pb file inside the state directory must be ignored.
    fs::write(
        temp.path().join(STATE_DIR_NAME).join("stray.pb"),
        b"META\nkey;value\n",
    )
    .unwrap();

    let report = index.refresh(false).await.unwrap();
    assert!(report.is_noop());
}
