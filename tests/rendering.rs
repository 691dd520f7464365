use apidex::card::{HtmlTarget, NO_RESULTS, TextTarget};
use apidex::dataset::from_json_str;
use apidex::engine::{FilterEngine, FilterResult};
use apidex::render::{IncrementalRenderer, RenderTarget, ScrollPosition};

fn setup(members: usize) -> FilterResult {
    let members: Vec<String> = (0..members)
        .map(|i| format!(r#"{{"name": "Member{i}", "member_type": "Property", "value_type": "int"}}"#))
        .collect();
    let json = format!(r#"{{"classes": [{{"name": "Big", "members": [{}]}}]}}"#, members.join(","));
    let mut engine = FilterEngine::default();
    engine.initialize(&from_json_str(&json).unwrap());
    engine.filter("").unwrap()
}

#[test]
fn batches_of_fifty() {
    let mut renderer = IncrementalRenderer::default();
    let mut target = HtmlTarget::default();
    renderer.set_results(setup(120));
    assert_eq!(renderer.rendered_count(), 0, "set_results renders nothing");
    renderer.render_next_batch(&mut target);
    assert_eq!(renderer.rendered_count(), 50);
    assert_eq!(target.indicator(), Some("Showing 50 of 120 results. Scroll to load more..."));
    renderer.render_next_batch(&mut target);
    renderer.render_next_batch(&mut target);
    assert_eq!(renderer.rendered_count(), 120);
    assert_eq!(target.card_count(), 120);
    assert_eq!(target.indicator(), None, "indicator removed once everything is shown");
    assert_eq!(renderer.render_next_batch(&mut target), 0, "fourth call is a no-op");
    assert_eq!(target.card_count(), 120);

    renderer.set_results(setup(10));
    assert_eq!(renderer.rendered_count(), 0, "new results reset the cursor");
}

#[test]
fn show_rebuilds_the_target() {
    let mut renderer = IncrementalRenderer::default();
    let mut target = HtmlTarget::default();
    assert_eq!(renderer.show(setup(70), &mut target), 50);
    assert_eq!(renderer.show(setup(3), &mut target), 3);
    assert_eq!(target.card_count(), 3);
    assert_eq!(renderer.show(Vec::new(), &mut target), 0);
    assert_eq!(target.card_count(), 0);
    assert!(target.html().contains(NO_RESULTS));
}

#[test]
fn one_batch_per_trigger() {
    let mut renderer = IncrementalRenderer::default();
    let mut target = HtmlTarget::default();
    renderer.show(setup(200), &mut target);
    let bottom = ScrollPosition { viewport_height: 800.0, scroll_y: 3000.0, document_height: 3500.0 };
    assert_eq!(renderer.on_scroll(bottom, &mut target), 50);
    assert_eq!(renderer.on_visibility(true, &mut target), 50);
    assert_eq!(renderer.rendered_count(), 150);
    let top = ScrollPosition { viewport_height: 800.0, scroll_y: 0.0, document_height: 3500.0 };
    assert_eq!(renderer.on_scroll(top, &mut target), 0);
    assert_eq!(renderer.on_visibility(false, &mut target), 0);
}

#[test]
fn text_cards() {
    let results = setup(2);
    let mut target = TextTarget::new(Vec::new());
    target.append(&results[..1]);
    target.show_progress(1, 2);
    let text = String::from_utf8(target.into_inner()).unwrap();
    assert!(text.starts_with("Member0 [Property]\n  Big\n  Type: int\n"));
    assert!(text.contains("Showing 1 of 2 results."));
}
