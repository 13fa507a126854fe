use hilvan_engine::battle::{beats, compare, dominance_pairs, validate_dominance, BattleOutcome};
use hilvan_engine::cards::{all_colors, all_elements, Card, Color, Element};

fn card(element: Element, level: u8) -> Card {
    Card::with_level(element, Color::Rojo, level).unwrap()
}

#[test]
fn dominance_has_four_pairs_forming_one_cycle() {
    let winning: Vec<(Element, Element)> = all_elements()
        .iter()
        .flat_map(|&a| all_elements().into_iter().map(move |b| (a, b)))
        .filter(|&(a, b)| a != b && compare(&card(a, 1), &card(b, 1)) == BattleOutcome::WinA)
        .collect();
    assert_eq!(winning.len(), 4);
    assert!(validate_dominance(&winning).is_ok());
    assert_eq!(winning.len(), dominance_pairs().len());
}

#[test]
fn no_pair_dominates_in_both_directions() {
    for a in all_elements() {
        for b in all_elements() {
            assert!(!(beats(a, b) && beats(b, a)), "{a} and {b} both win");
        }
    }
}

#[test]
fn adjacent_elements_win_regardless_of_level() {
    // Boton beats Alfiler even at the lowest level
    let weak = card(Element::Boton, 1);
    let strong = card(Element::Alfiler, 3);
    assert_eq!(compare(&weak, &strong), BattleOutcome::WinA);
    assert_eq!(compare(&strong, &weak), BattleOutcome::WinB);

    let algodon = card(Element::Algodon, 1);
    let boton = card(Element::Boton, 3);
    assert_eq!(compare(&algodon, &boton), BattleOutcome::WinA);
}

#[test]
fn same_element_breaks_ties_on_star_level() {
    let two = card(Element::Tela, 2);
    let three = card(Element::Tela, 3);
    assert_eq!(compare(&two, &three), BattleOutcome::WinB);
    assert_eq!(compare(&three, &two), BattleOutcome::WinA);
    assert_eq!(compare(&two, &two), BattleOutcome::Draw);
}

#[test]
fn opposite_elements_fall_through_to_star_level() {
    // Boton/Tela and Alfiler/Algodon sit across the cycle from each other
    assert!(!beats(Element::Boton, Element::Tela) && !beats(Element::Tela, Element::Boton));
    assert_eq!(
        compare(&card(Element::Boton, 3), &card(Element::Tela, 1)),
        BattleOutcome::WinA
    );
    assert_eq!(
        compare(&card(Element::Boton, 1), &card(Element::Tela, 3)),
        BattleOutcome::WinB
    );
    assert_eq!(
        compare(&card(Element::Alfiler, 2), &card(Element::Algodon, 2)),
        BattleOutcome::Draw
    );
}

#[test]
fn color_never_affects_the_battle() {
    for color in all_colors() {
        let a = Card::with_level(Element::Alfiler, color, 2).unwrap();
        let b = Card::with_level(Element::Alfiler, Color::Morado, 2).unwrap();
        assert_eq!(compare(&a, &b), BattleOutcome::Draw);
    }
}

#[test]
fn compare_is_antisymmetric_over_the_whole_pool() {
    let pool = hilvan_engine::cards::full_pool();
    for a in &pool {
        for b in &pool {
            assert_eq!(compare(a, b), compare(b, a).flipped());
        }
    }
}
