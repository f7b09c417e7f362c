use crate::models::BoundingBox;

/// One issued viewport query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportTicket {
    pub sequence: u64,
    pub bbox: Option<BoundingBox>,
}

/// Orders overlapping viewport queries.
///
/// Queries may complete in any order. A result is applied only if it was
/// issued after every result applied so far, so the displayed parcels always
/// belong to the newest completed query and never go backwards.
#[derive(Debug, Default)]
pub struct ViewportQueryController {
    issued: u64,
    applied: u64,
}

impl ViewportQueryController {
    pub fn begin(&mut self, bbox: Option<BoundingBox>) -> ViewportTicket {
        self.issued += 1;
        ViewportTicket {
            sequence: self.issued,
            bbox,
        }
    }

    /// Returns true if the ticket's result should replace what is displayed.
    pub fn accept(&mut self, ticket: &ViewportTicket) -> bool {
        if ticket.sequence <= self.applied {
            return false;
        }
        self.applied = ticket.sequence;
        true
    }

    pub fn latest_applied(&self) -> u64 {
        self.applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_order_completion_applies_everything() {
        let mut controller = ViewportQueryController::default();
        let a = controller.begin(None);
        let b = controller.begin(Some(BoundingBox::new(2.0, 41.0, 2.5, 41.5)));
        assert!(controller.accept(&a));
        assert!(controller.accept(&b));
        assert_eq!(controller.latest_applied(), 2);
    }

    #[test]
    fn late_older_result_is_discarded() {
        let mut controller = ViewportQueryController::default();
        let a = controller.begin(None);
        let b = controller.begin(None);
        assert!(controller.accept(&b));
        assert!(!controller.accept(&a));
        assert_eq!(controller.latest_applied(), b.sequence);
    }

    #[test]
    fn a_ticket_applies_once() {
        let mut controller = ViewportQueryController::default();
        let a = controller.begin(None);
        assert!(controller.accept(&a));
        assert!(!controller.accept(&a));
    }
}
