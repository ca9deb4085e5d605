use std::collections::HashMap;

use crate::entities::*;

/// Decides whether `next` differs materially from the rendered snapshot.
///
/// The order of the pins is irrelevant. Without a previous snapshot
/// (first load) the pins are always considered changed.
pub fn has_changed(previous: Option<&PinSetSnapshot>, next: &[Pin]) -> bool {
    let Some(previous) = previous else {
        return true;
    };
    if previous.len() != next.len() {
        return true;
    }
    let previous_by_id: HashMap<PinId, &Pin> =
        previous.pins().iter().map(|pin| (pin.id, pin)).collect();
    let next_by_id: HashMap<PinId, &Pin> = next.iter().map(|pin| (pin.id, pin)).collect();
    if previous_by_id.len() != next_by_id.len() {
        return true;
    }
    next_by_id.iter().any(|(id, next)| {
        previous_by_id
            .get(id)
            .map_or(true, |previous| !previous.same_content(next))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use nostalgia_entities::builders::*;

    fn pin(id: u64, business: Option<&str>) -> Pin {
        Pin::build()
            .id(id)
            .pos(MapPoint::from_lat_lng_deg(47.6, -122.3))
            .address("1st Ave")
            .current_business(business)
            .current_category(Some("Restaurant"))
            .finish()
    }

    #[test]
    fn first_load_is_always_a_change() {
        assert!(has_changed(None, &[]));
        assert!(has_changed(None, &[pin(1, None)]));
    }

    #[test]
    fn same_pins_in_any_order_are_unchanged() {
        let previous = PinSetSnapshot::new(vec![pin(1, Some("A")), pin(2, None), pin(3, Some("C"))]);
        let next = vec![pin(3, Some("C")), pin(1, Some("A")), pin(2, None)];
        assert!(!has_changed(Some(&previous), &next));
        assert!(!has_changed(Some(&previous), previous.pins()));
    }

    #[test]
    fn empty_sets_are_unchanged() {
        assert!(!has_changed(Some(&PinSetSnapshot::default()), &[]));
    }

    #[test]
    fn added_or_removed_pins_are_a_change() {
        let previous = PinSetSnapshot::new(vec![pin(1, None), pin(2, None)]);
        assert!(has_changed(Some(&previous), &[pin(1, None)]));
        assert!(has_changed(
            Some(&previous),
            &[pin(1, None), pin(2, None), pin(3, None)]
        ));
        // same size, different ids
        assert!(has_changed(Some(&previous), &[pin(1, None), pin(4, None)]));
    }

    #[test]
    fn modified_fields_are_a_change() {
        let previous = PinSetSnapshot::new(vec![pin(1, Some("A")), pin(2, None)]);
        assert!(has_changed(Some(&previous), &[pin(1, Some("B")), pin(2, None)]));

        let mut moved = pin(2, None);
        moved.pos = MapPoint::from_lat_lng_deg(47.6, -122.30001);
        assert!(has_changed(Some(&previous), &[pin(1, Some("A")), moved]));

        let mut recategorized = pin(2, None);
        recategorized.current_category = None;
        assert!(has_changed(Some(&previous), &[pin(1, Some("A")), recategorized]));

        let mut readdressed = pin(2, None);
        readdressed.address = "2nd Ave".into();
        assert!(has_changed(Some(&previous), &[pin(1, Some("A")), readdressed]));
    }

    #[test]
    fn duplicate_ids_are_a_change() {
        let previous = PinSetSnapshot::new(vec![pin(1, None), pin(2, None)]);
        assert!(has_changed(Some(&previous), &[pin(1, None), pin(1, None)]));
    }
}
