use async_trait::async_trait;
use dealroom_core::{Deal, DealStatRow};
use dealroom_ports::{Clock, DeliveryError, StatsRecorder};
use log::info;
use parking_lot::Mutex;
use std::sync::Arc;

/// Stats sink that logs each sold item and keeps the rows in memory
pub struct RecordingStatsRecorder {
    clock: Arc<dyn Clock>,
    rows: Mutex<Vec<DealStatRow>>,
}

impl RecordingStatsRecorder {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            rows: Mutex::new(Vec::new()),
        }
    }

    pub fn rows(&self) -> Vec<DealStatRow> {
        self.rows.lock().clone()
    }
}

#[async_trait]
impl StatsRecorder for RecordingStatsRecorder {
    async fn record_deal(&self, deal: &Deal) -> Result<(), DeliveryError> {
        let rows = DealStatRow::from_deal(deal, self.clock.now());
        for row in &rows {
            info!(
                "Stat row deal_id={} coin_id={} price={} quantity={} mode={:?}",
                row.deal_id, row.coin_id, row.price, row.quantity, row.mode
            );
        }
        self.rows.lock().extend(rows);
        Ok(())
    }
}
