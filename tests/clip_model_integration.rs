/// End-to-end run against the real CLIP model
///
/// Downloads the model weights on first run, so every test here is ignored by
/// default. Run with: cargo test --test clip_model_integration -- --ignored
mod common;

use common::Library;
use mediasift::{Engine, NoProgress, StopFlag};
use std::path::Path;

#[test]
#[ignore] // Requires model download (~600MB) - run with: cargo test -- --ignored
fn test_clip_index_and_search() {
    let library = Library::new();
    library.image("red.png", [220, 20, 20]);
    library.image("green.png", [20, 200, 40]);
    library.image("blue.png", [20, 40, 220]);

    let engine = Engine::open(&library.config).expect("Failed to open engine");
    let outcome = engine
        .update(&library.media(), &NoProgress, &StopFlag::new())
        .unwrap();
    assert!(outcome.did_work());
    assert_eq!(engine.status().dimension, Some(512));

    let hits = engine.search("a plain red square", 3).unwrap();
    let best = Path::new(&hits[0].path).file_name().unwrap();
    assert_eq!(best, "red.png");

    println!("Ranking for 'a plain red square':");
    for hit in &hits {
        println!("  {:>5.1}  {}", hit.score, hit.path);
    }
}
