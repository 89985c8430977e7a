mod common;

use common::{palette, ColorEmbedder, Library};
use mediasift::search::paginate;
use mediasift::{NoProgress, StopFlag};
use std::fs;
use std::path::Path;

fn file_name(path: &str) -> &str {
    Path::new(path).file_name().unwrap().to_str().unwrap()
}

#[test]
fn test_color_queries_rank_matching_images_first() {
    let library = Library::new();
    library.image("red.png", [220, 20, 20]);
    library.image("green.png", [20, 220, 20]);
    library.image("blue.png", [20, 20, 220]);
    let engine = library.engine(&ColorEmbedder::new());
    engine
        .update(&library.media(), &NoProgress, &StopFlag::new())
        .unwrap();

    for (query, expected) in [
        ("a red car", "red.png"),
        ("green fields", "green.png"),
        ("Blue sky", "blue.png"),
    ] {
        let hits = engine.search(query, 3).unwrap();
        assert_eq!(hits.len(), 3);
        assert_eq!(file_name(&hits[0].path), expected, "query {:?}", query);
        assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
        assert!(hits.iter().all(|h| (0.0..=100.0).contains(&h.score)));
    }
}

#[test]
fn test_top_k_truncates() {
    let library = Library::new();
    for i in 0..12 {
        library.image(&format!("img_{:02}.png", i), palette(i));
    }
    let engine = library.engine(&ColorEmbedder::new());
    engine
        .update(&library.media(), &NoProgress, &StopFlag::new())
        .unwrap();

    assert_eq!(engine.search("red", 5).unwrap().len(), 5);
    assert_eq!(engine.search("red", 200).unwrap().len(), 12);
}

#[test]
fn test_equal_scores_keep_path_order() {
    let library = Library::new();
    for name in ["c.png", "a.png", "b.png"] {
        library.image(name, [90, 90, 90]);
    }
    let engine = library.engine(&ColorEmbedder::new());
    engine
        .update(&library.media(), &NoProgress, &StopFlag::new())
        .unwrap();

    let hits = engine.search("anything", 10).unwrap();
    let names: Vec<&str> = hits.iter().map(|h| file_name(&h.path)).collect();
    assert_eq!(names, vec!["a.png", "b.png", "c.png"]);
}

#[test]
fn test_blank_query_returns_nothing() {
    let library = Library::new();
    library.image("red.png", [220, 20, 20]);
    let engine = library.engine(&ColorEmbedder::new());
    engine
        .update(&library.media(), &NoProgress, &StopFlag::new())
        .unwrap();

    assert!(engine.search("", 10).unwrap().is_empty());
    assert!(engine.search(" \t", 10).unwrap().is_empty());
}

#[test]
fn test_pages_match_slices_of_the_full_ranking() {
    let library = Library::new();
    for i in 0..23 {
        library.image(&format!("img_{:02}.png", i), palette(i));
    }
    let engine = library.engine(&ColorEmbedder::new());
    engine
        .update(&library.media(), &NoProgress, &StopFlag::new())
        .unwrap();

    let all = engine.search("red", 200).unwrap();
    assert_eq!(all.len(), 23);

    let per_page = 5;
    for page in 1..=6 {
        let direct = engine.search_page("red", page, per_page).unwrap();
        assert_eq!(direct, paginate(&all, page, per_page));
        assert_eq!(direct.total, 23);
        assert_eq!(direct.has_more, page * per_page < 23);

        let start = ((page - 1) * per_page).min(23);
        let end = (page * per_page).min(23);
        assert_eq!(direct.results, all[start..end].to_vec());
    }
}

#[test]
fn test_malformed_snapshot_starts_empty() {
    let library = Library::new();
    fs::create_dir_all(&library.config.storage.data_dir).unwrap();
    fs::write(library.snapshot_path(), b"\x80\x04\x95 not an index at all").unwrap();

    let engine = library.engine(&ColorEmbedder::new());
    let status = engine.status();
    assert_eq!(status.entries, 0);
    assert!(!status.exists);
    assert!(!engine.exists_and_nonempty());
    assert!(engine.last_update_time().is_none());
    assert!(engine.search("red", 10).unwrap().is_empty());

    // The next update replaces the unreadable file
    library.image("red.png", [220, 20, 20]);
    engine
        .update(&library.media(), &NoProgress, &StopFlag::new())
        .unwrap();
    assert!(engine.exists_and_nonempty());
}

#[test]
fn test_status_reports_pending_progress() {
    let mut library = Library::new();
    library.config.indexing.checkpoint_interval = 1;
    for i in 0..3 {
        library.image(&format!("img_{}.png", i), palette(i));
    }
    let engine = library.engine(&ColorEmbedder::new());

    let stop = StopFlag::new();
    let stopper = |processed: usize, _total: usize| {
        if processed == 1 {
            stop.request_stop();
        }
    };
    engine.update(&library.media(), &stopper, &stop).unwrap();

    let status = engine.status();
    assert!(status.exists);
    assert_eq!(status.entries, 1);
    assert_eq!(status.dimension, Some(3));
    assert!(status.last_updated.is_some());

    let pending = status.pending_progress.unwrap();
    assert_eq!((pending.processed_files, pending.total_files), (1, 3));
}
