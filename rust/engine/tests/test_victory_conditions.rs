use hilvan_engine::cards::{Card, Color, Element};
use hilvan_engine::player::PlayerId;
use hilvan_engine::pool::seeded_rng;
use hilvan_engine::victory::{
    meets_win_condition, RecordOutcome, Victory, VictoryRejection, VictoryTracker,
};

fn card(element: Element, color: Color) -> Card {
    Card::with_level(element, color, 2).unwrap()
}

fn v(element: Element, color: Color) -> Victory {
    Victory::new(element, color)
}

#[test]
fn duplicate_pair_is_capped_at_two() {
    let mut t = VictoryTracker::new();
    let p = PlayerId::new(1);
    let tela_rojo = card(Element::Tela, Color::Rojo);
    assert_eq!(
        t.record_if_eligible(p, &tela_rojo),
        RecordOutcome::Recorded { has_won: false }
    );
    assert_eq!(
        t.record_if_eligible(p, &tela_rojo),
        RecordOutcome::Recorded { has_won: false }
    );
    assert_eq!(
        t.record_if_eligible(p, &tela_rojo),
        RecordOutcome::Rejected(VictoryRejection::DuplicateCap)
    );
    assert_eq!(t.victories(p), &[v(Element::Tela, Color::Rojo); 2]);
}

#[test]
fn four_distinct_elements_win_regardless_of_color() {
    let list = [
        v(Element::Boton, Color::Rojo),
        v(Element::Alfiler, Color::Rojo),
        v(Element::Tela, Color::Rojo),
        v(Element::Algodon, Color::Rojo),
    ];
    assert!(meets_win_condition(&list));

    let mut t = VictoryTracker::new();
    let p = PlayerId::new(4);
    for victory in &list[..3] {
        t.record_if_eligible(p, &card(victory.element, victory.color));
    }
    assert!(!t.has_won(p));
    assert_eq!(
        t.record_if_eligible(p, &card(Element::Algodon, Color::Verde)),
        RecordOutcome::Recorded { has_won: true }
    );
    assert!(t.has_won(p));
}

#[test]
fn four_of_one_element_with_at_most_two_per_color_wins() {
    let list = [
        v(Element::Tela, Color::Rojo),
        v(Element::Tela, Color::Rojo),
        v(Element::Tela, Color::Verde),
        v(Element::Tela, Color::Morado),
    ];
    assert!(meets_win_condition(&list));
}

#[test]
fn one_color_three_times_blocks_the_focused_win() {
    let list = [
        v(Element::Tela, Color::Rojo),
        v(Element::Tela, Color::Rojo),
        v(Element::Tela, Color::Rojo),
        v(Element::Tela, Color::Verde),
    ];
    assert!(!meets_win_condition(&list));
}

#[test]
fn three_elements_with_duplicates_do_not_win() {
    let list = [
        v(Element::Boton, Color::Rojo),
        v(Element::Boton, Color::Verde),
        v(Element::Alfiler, Color::Rojo),
        v(Element::Tela, Color::Morado),
        v(Element::Tela, Color::Verde),
    ];
    assert!(!meets_win_condition(&list));
    assert!(!meets_win_condition(&[]));
}

#[test]
fn removal_can_undo_a_win() {
    let mut t = VictoryTracker::new();
    let p = PlayerId::new(2);
    for element in [Element::Boton, Element::Alfiler, Element::Tela, Element::Algodon] {
        t.record_if_eligible(p, &card(element, Color::Morado));
    }
    assert!(t.has_won(p));
    assert!(t.remove_specific(p, Element::Tela, Color::Morado));
    assert!(!t.has_won(p));
    assert!(!t.remove_specific(p, Element::Tela, Color::Morado));
}

#[test]
fn random_removal_is_reproducible_with_a_seed() {
    let build = || {
        let mut t = VictoryTracker::new();
        for element in [Element::Boton, Element::Alfiler, Element::Tela] {
            t.record_if_eligible(PlayerId::new(1), &card(element, Color::Verde));
        }
        t
    };
    let mut a = build();
    let mut b = build();
    let ra = a.remove_random(PlayerId::new(1), &mut seeded_rng(99));
    let rb = b.remove_random(PlayerId::new(1), &mut seeded_rng(99));
    assert!(ra.is_some());
    assert_eq!(ra, rb);
    assert_eq!(a.victories(PlayerId::new(1)).len(), 2);
}

#[test]
fn reset_all_clears_every_player() {
    let mut t = VictoryTracker::new();
    t.record_if_eligible(PlayerId::new(1), &card(Element::Boton, Color::Rojo));
    t.record_if_eligible(PlayerId::new(2), &card(Element::Tela, Color::Rojo));
    t.reset_all();
    assert!(t.victories(PlayerId::new(1)).is_empty());
    assert!(t.victories(PlayerId::new(2)).is_empty());
}
