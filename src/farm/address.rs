//! Address lookup seam.

use anyhow::Result;
use async_trait::async_trait;

/// Source of a free-text street address (a search widget, a prompt, ...).
#[async_trait]
pub trait AddressPicker: Send + Sync {
    /// `Ok(None)` means the user closed the picker without choosing.
    async fn pick(&self) -> Result<Option<String>>;
}

/// Picker that always answers with the same address.
pub struct FixedAddress(pub Option<String>);

#[async_trait]
impl AddressPicker for FixedAddress {
    async fn pick(&self) -> Result<Option<String>> {
        Ok(self.0.clone())
    }
}
