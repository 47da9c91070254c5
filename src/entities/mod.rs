//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod enums;
pub mod guest_payment;
pub mod payment_group;
pub mod payment_group_member;
pub mod payment_reminder;
pub mod proposal_day;
pub mod proposal_guest;
pub mod proposal_inclusion;
pub mod proposal_stop;
pub mod trip_proposal;

// Re-export specific types to avoid conflicts
pub use guest_payment::{Entity as GuestPayment, Model as GuestPaymentModel};
pub use payment_group::{Entity as PaymentGroup, Model as PaymentGroupModel};
pub use payment_group_member::{Entity as PaymentGroupMember, Model as PaymentGroupMemberModel};
pub use payment_reminder::{Entity as PaymentReminder, Model as PaymentReminderModel};
pub use proposal_day::{Entity as ProposalDay, Model as ProposalDayModel};
pub use proposal_guest::{Entity as ProposalGuest, Model as ProposalGuestModel};
pub use proposal_inclusion::{Entity as ProposalInclusion, Model as ProposalInclusionModel};
pub use proposal_stop::{Entity as ProposalStop, Model as ProposalStopModel};
pub use trip_proposal::{Entity as TripProposal, Model as TripProposalModel};
