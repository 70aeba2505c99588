//! Farm screens: the registration form and the read-only views.

pub mod address;
pub mod form;
pub mod view;

pub use address::{AddressPicker, FixedAddress};
pub use form::{CheckReport, DeviceField, Dialog, FarmDraft, FarmField, FarmForm};
pub use view::{FarmDetailView, FarmListView, FetchTicket, ViewState};
