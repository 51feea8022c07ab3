use chrono::Utc;
use dealroom_core::{Actor, AuctionStats, Deal, DealItem, DealMode, NewDeal};
use rust_decimal_macros::dec;
use uuid::Uuid;

pub struct Parties {
    pub seller: Actor,
    pub buyer: Actor,
    pub stranger: Actor,
}

pub fn parties() -> Parties {
    Parties {
        seller: Actor::new(Uuid::new_v4(), "seller"),
        buyer: Actor::new(Uuid::new_v4(), "buyer"),
        stranger: Actor::new(Uuid::new_v4(), "stranger"),
    }
}

pub fn deal(parties: &Parties, mode: DealMode, items: usize) -> Deal {
    Deal::open(
        Uuid::new_v4(),
        NewDeal {
            auction_id: Some(Uuid::new_v4()),
            seller_id: parties.seller.user_id,
            buyer_id: Some(parties.buyer.user_id),
            mode,
            items: (0..items)
                .map(|_| DealItem::new(Uuid::new_v4(), Uuid::new_v4(), dec!(100)))
                .collect(),
            starting_price: dec!(100),
            final_price: None,
            guarantee_enabled: mode == DealMode::Guaranteed,
            guarantee_initiated_by: None,
            auto_cancel_at: None,
            auction_stats: AuctionStats::default(),
            requested_at: Utc::now(),
        },
    )
}
