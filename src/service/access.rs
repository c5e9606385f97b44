// service/access.rs
//
// Authorization over the order/application relationship graph. Everything
// here operates on plain values already loaded from the store, so the rules
// stay unit-testable without a database.
use uuid::Uuid;

use crate::models::ordermodel::Order;

/// Outcome of counterpart resolution for a (order, caller) pair.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// The conversation is one-to-one with this user.
    Counterpart(Uuid),
    /// The caller is the customer, no freelancer is assigned and none was
    /// named: the caller must pick one of the applicants first.
    SelectionRequired,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResolveError {
    /// An explicitly named freelancer has no application on this order.
    NotAnApplicant(Uuid),
}

/// A user may act on an order iff they are its customer, its assigned
/// freelancer, or they have an application recorded on it.
pub fn can_access_order(order: &Order, applicant_ids: &[Uuid], user_id: Uuid) -> bool {
    if order.customer_id == user_id {
        return true;
    }
    if order.freelancer_id == Some(user_id) {
        return true;
    }
    applicant_ids.contains(&user_id)
}

/// Determine who the caller is talking to on this order.
///
/// A freelancer's counterpart is always the customer. The customer's side
/// is one-to-many until assignment: once a freelancer is assigned that
/// assignment is authoritative and any explicitly named freelancer is
/// ignored; before assignment an explicit choice must match a recorded
/// application, and the absence of a choice means the caller has to select
/// an applicant before any exchange can happen.
pub fn resolve_counterpart(
    order: &Order,
    applicant_ids: &[Uuid],
    user_id: Uuid,
    explicit_freelancer_id: Option<Uuid>,
) -> Result<Resolution, ResolveError> {
    if order.customer_id != user_id {
        return Ok(Resolution::Counterpart(order.customer_id));
    }

    if let Some(assigned) = order.freelancer_id {
        return Ok(Resolution::Counterpart(assigned));
    }

    match explicit_freelancer_id {
        Some(freelancer_id) => {
            if applicant_ids.contains(&freelancer_id) {
                Ok(Resolution::Counterpart(freelancer_id))
            } else {
                Err(ResolveError::NotAnApplicant(freelancer_id))
            }
        }
        None => Ok(Resolution::SelectionRequired),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(customer_id: Uuid, freelancer_id: Option<Uuid>) -> Order {
        Order {
            id: Uuid::new_v4(),
            customer_id,
            freelancer_id,
            title: "Landing page".to_string(),
            status: None,
            created_at: None,
        }
    }

    #[test]
    fn access_is_granted_to_exactly_the_participants() {
        let customer = Uuid::new_v4();
        let assigned = Uuid::new_v4();
        let applicant = Uuid::new_v4();
        let stranger = Uuid::new_v4();

        let order = order(customer, Some(assigned));
        let applicants = vec![applicant];

        assert!(can_access_order(&order, &applicants, customer));
        assert!(can_access_order(&order, &applicants, assigned));
        assert!(can_access_order(&order, &applicants, applicant));
        assert!(!can_access_order(&order, &applicants, stranger));
    }

    #[test]
    fn access_via_application_alone_before_assignment() {
        let customer = Uuid::new_v4();
        let applicant = Uuid::new_v4();

        let order = order(customer, None);
        assert!(can_access_order(&order, &[applicant], applicant));
        assert!(!can_access_order(&order, &[], applicant));
    }

    #[test]
    fn freelancer_counterpart_is_always_the_customer() {
        let customer = Uuid::new_v4();
        let freelancer = Uuid::new_v4();

        let unassigned = order(customer, None);
        let resolution =
            resolve_counterpart(&unassigned, &[freelancer], freelancer, None).unwrap();
        assert_eq!(resolution, Resolution::Counterpart(customer));

        // An explicit id from a freelancer caller changes nothing.
        let assigned = order(customer, Some(freelancer));
        let resolution =
            resolve_counterpart(&assigned, &[], freelancer, Some(Uuid::new_v4())).unwrap();
        assert_eq!(resolution, Resolution::Counterpart(customer));
    }

    #[test]
    fn assignment_overrides_a_stale_explicit_selection() {
        let customer = Uuid::new_v4();
        let f1 = Uuid::new_v4();
        let f2 = Uuid::new_v4();

        let order = order(customer, Some(f1));
        let resolution = resolve_counterpart(&order, &[f1, f2], customer, Some(f2)).unwrap();
        assert_eq!(resolution, Resolution::Counterpart(f1));
    }

    #[test]
    fn customer_without_assignment_must_pick_an_applicant() {
        let customer = Uuid::new_v4();
        let f1 = Uuid::new_v4();
        let f2 = Uuid::new_v4();
        let f3 = Uuid::new_v4();

        let order = order(customer, None);
        let applicants = vec![f1, f2];

        let resolution = resolve_counterpart(&order, &applicants, customer, None).unwrap();
        assert_eq!(resolution, Resolution::SelectionRequired);

        let resolution = resolve_counterpart(&order, &applicants, customer, Some(f1)).unwrap();
        assert_eq!(resolution, Resolution::Counterpart(f1));

        let result = resolve_counterpart(&order, &applicants, customer, Some(f3));
        assert_eq!(result, Err(ResolveError::NotAnApplicant(f3)));
    }
}
