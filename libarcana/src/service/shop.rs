//! Coin purchase flow

use tracing::{debug, info, warn};

use super::events::{Event, Flow};
use super::notifications::Severity;
use super::ArcanaService;
use crate::error::{PreconditionError, Result};
use crate::gateway::{PurchaseReceipt, PurchaseRequest};
use crate::profile::Achievement;

impl ArcanaService {
    /// Buy a coin package; the service's balance replaces the local one
    pub async fn purchase_coins(&mut self, package_id: &str) -> Result<PurchaseReceipt> {
        self.ensure_ready()?;
        if self.catalog.coin_package(package_id).is_none() {
            return Err(self.reject(PreconditionError::UnknownPackage(package_id.to_string())));
        }

        let request = PurchaseRequest {
            package_id: package_id.to_string(),
        };

        debug!(package = package_id, "Purchasing coins");
        self.event_bus.emit(Event::FlowStarted {
            flow: Flow::Purchase,
        });

        let receipt = match self.gateway.purchase_coins(&self.profile.id, &request).await {
            Ok(receipt) => receipt,
            Err(err) => {
                warn!("Purchase failed: {}", err);
                let message = err.service_message().unwrap_or("Error purchasing coins");
                self.notify(message, Severity::Error);
                self.finish(Flow::Purchase, false);
                return Err(err);
            }
        };

        self.profile.set_balance(receipt.new_balance);
        self.save_profile();

        info!(
            coins_added = receipt.coins_added,
            balance = receipt.new_balance,
            "Purchase completed"
        );
        self.notify(
            format!("Successfully purchased {} coins!", receipt.coins_added),
            Severity::Success,
        );

        self.award_achievements(&[Achievement::CoinCollector]);
        self.finish(Flow::Purchase, true);

        Ok(receipt)
    }
}
