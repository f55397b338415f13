use intake_spec::{LayoutId, Segment, fnv32a, subscreen_hash};
use proptest::prelude::*;

#[test]
fn parses_nested_subscreen_address() {
    let id: LayoutId = "se:2|sc:0|qu:1|te:3340123|sc:4".parse().expect("valid id");
    assert_eq!(
        id.segments(),
        &[
            Segment::Section(2),
            Segment::Screen(0),
            Segment::Question(1),
            Segment::Template("3340123".into()),
            Segment::Screen(4),
        ]
    );
    assert_eq!(id.section_index(), 2);
}

#[test]
fn subscreen_hash_joins_id_and_text() {
    assert_eq!(subscreen_hash("10", "Headache"), fnv32a("10|Headache"));
    assert_ne!(subscreen_hash("10", "Headache"), subscreen_hash("11", "Headache"));
    assert_eq!(subscreen_hash("", "Aspirin"), fnv32a("|Aspirin"));
}

fn layout_id_strategy() -> impl Strategy<Value = LayoutId> {
    (
        0usize..20,
        0usize..20,
        prop::collection::vec((0usize..10, any::<u32>(), 0usize..10), 0..3),
    )
        .prop_map(|(section, screen, nesting)| {
            let mut id = LayoutId::section(section).screen(screen);
            for (question, hash, sub_screen) in nesting {
                id = id.question(question).template(hash).screen(sub_screen);
            }
            id
        })
}

proptest! {
    #[test]
    fn display_and_parse_agree(id in layout_id_strategy()) {
        let parsed = LayoutId::parse(&id.to_string()).expect("parse");
        prop_assert_eq!(parsed, id);
    }

    #[test]
    fn question_ids_round_trip(id in layout_id_strategy(), question in 0usize..50) {
        let question_id = id.question(question);
        let parsed: LayoutId = question_id.to_string().parse().expect("parse");
        prop_assert_eq!(parsed.to_string(), question_id.to_string());
    }
}
