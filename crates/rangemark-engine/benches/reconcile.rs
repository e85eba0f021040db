use criterion::{Criterion, criterion_group, criterion_main};
use rangemark_engine::{
    AddressKind, Affinity, DocumentTree, Locator, OverlapPolicy, RangeStore, Renderer, Span,
    TreeLocator, parse_html,
};

fn generate_document(paragraphs: usize) -> String {
    (0..paragraphs)
        .map(|i| format!("<p>Paragraph {i} has <em>some</em> text worth highlighting.</p>\n"))
        .collect()
}

/// A store with one short range every `step` characters.
fn populated_store(tree: &DocumentTree, policy: OverlapPolicy, step: usize) -> RangeStore {
    let locator = TreeLocator::new(tree, tree.root(), AddressKind::Path);
    let len = tree.text_len(tree.root());
    let mut store = RangeStore::new(policy);
    for start in (0..len.saturating_sub(step)).step_by(step) {
        let span = Span::new(start, start + step / 2 + 1);
        let (Ok(from), Ok(to)) = (
            locator.boundary_at(span.start, Affinity::Forward),
            locator.boundary_at(span.end, Affinity::Backward),
        ) else {
            continue;
        };
        let _ = store.add(&locator, from, to, locator.text_in(span));
    }
    store
}

fn bench_reconcile(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconcile");
    group.sample_size(10);

    let tree = parse_html(&generate_document(100));
    let store = populated_store(&tree, OverlapPolicy::Reject, 20);

    group.bench_function("merge_all", |b| {
        let locator = TreeLocator::new(&tree, tree.root(), AddressKind::Path);
        b.iter(|| {
            let mut s = store.clone();
            std::hint::black_box(s.merge_all(&locator));
        });
    });

    group.bench_function("split_on_erase", |b| {
        let locator = TreeLocator::new(&tree, tree.root(), AddressKind::Path);
        b.iter(|| {
            let mut s = store.clone();
            let _ = std::hint::black_box(s.split_on_erase(&locator, Span::new(500, 1500)));
        });
    });

    group.bench_function("render", |b| {
        let renderer = Renderer::default();
        let mut t = tree.clone();
        b.iter(|| {
            let root = t.root();
            std::hint::black_box(renderer.render(&mut t, root, &store));
        });
    });

    group.finish();
}

criterion_group!(benches, bench_reconcile);
criterion_main!(benches);
