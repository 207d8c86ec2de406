// src/book.rs
//! Per-symbol limit order book with aggregated price-level depth.
//!
//! Each book tracks individual resting orders per side, keyed by order id,
//! plus one sorted aggregate map per side whose keys double as the price
//! ladder. Every operation reports whether it changed the visible prefix
//! (the top-N price levels) of the affected side, which is what drives
//! depth reprints downstream.
//!
//! ## Key properties
//!
//! - **Sorted levels**: `BTreeMap` per side, so the ladder is the key set
//!   and ordering holds structurally. Buys iterate in reverse (descending),
//!   sells forward (ascending).
//! - **Order tracking**: `hashbrown::HashMap` from order id to price and
//!   volume, one map per side.
//! - **Change detection**: the visible prefix is captured before a mutation
//!   and compared after. Touching a price outside the prefix on both ends
//!   of the mutation reports no change.
//! - **Failure atomicity**: every recoverable error is detected before the
//!   book is touched, so a rejected record leaves the book as it was.
//!
//! ## Example
//!
//! ```rust
//! use depthfeed::book::{Books, Side, Symbol};
//!
//! let mut books = Books::new(3);
//! let changed = books.add(Symbol(*b"ABC"), 1, Side::Buy, 100, 10).unwrap();
//! assert!(changed);
//!
//! let book = books.get(Symbol(*b"ABC")).unwrap();
//! assert_eq!(book.visible(Side::Buy)[0].price, 100);
//! ```

use hashbrown::HashMap;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

pub type OrderId = u64;

/// Wire byte for the buy side ('B').
pub const SIDE_BUY: u8 = 0x42;
/// Wire byte for the sell side ('S').
pub const SIDE_SELL: u8 = 0x53;

/// Three-byte instrument identifier, compared and hashed bytewise.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Symbol(pub [u8; 3]);

impl Symbol {
    #[inline]
    pub fn as_bytes(&self) -> &[u8; 3] {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            write!(f, "{}", b as char)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({self})")
    }
}

impl From<[u8; 3]> for Symbol {
    fn from(raw: [u8; 3]) -> Self {
        Symbol(raw)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Maps a wire side byte, returning `None` for anything but 'B'/'S'.
    #[inline]
    pub fn from_wire(b: u8) -> Option<Side> {
        match b {
            SIDE_BUY => Some(Side::Buy),
            SIDE_SELL => Some(Side::Sell),
            _ => None,
        }
    }
}

/// One aggregated price level as it appears in depth output.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Level {
    pub price: i32,
    pub volume: u64,
}

#[derive(Clone, Copy, Debug)]
struct Order {
    price: i32,
    volume: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum BookError {
    #[error("order {0} already exists on this side")]
    DuplicateOrder(OrderId),
    #[error("no book for symbol {0}")]
    UnknownSymbol(Symbol),
    #[error("order {0} does not exist on this side")]
    UnknownOrder(OrderId),
    #[error("unrecognized side byte 0x{0:02x}")]
    UnknownSide(u8),
    #[error("order {0} carries zero volume")]
    ZeroVolume(OrderId),
    #[error("aggregated level missing at price {0} during decrement")]
    InvariantViolation(i32),
}

impl BookError {
    /// A fatal error indicates engine-state corruption; everything else is
    /// a per-record rejection the stream survives.
    #[inline]
    pub fn is_fatal(&self) -> bool {
        matches!(self, BookError::InvariantViolation(_))
    }
}

/// Order book for a single symbol.
pub struct OrderBook {
    depth: usize,
    buys: HashMap<OrderId, Order>,
    sells: HashMap<OrderId, Order>,
    agg_buy: BTreeMap<i32, u64>,
    agg_sell: BTreeMap<i32, u64>,
}

impl OrderBook {
    pub fn new(depth: usize) -> Self {
        Self {
            depth,
            buys: HashMap::new(),
            sells: HashMap::new(),
            agg_buy: BTreeMap::new(),
            agg_sell: BTreeMap::new(),
        }
    }

    #[inline]
    fn orders(&self, side: Side) -> &HashMap<OrderId, Order> {
        match side {
            Side::Buy => &self.buys,
            Side::Sell => &self.sells,
        }
    }

    #[inline]
    fn orders_mut(&mut self, side: Side) -> &mut HashMap<OrderId, Order> {
        match side {
            Side::Buy => &mut self.buys,
            Side::Sell => &mut self.sells,
        }
    }

    #[inline]
    fn levels_mut(&mut self, side: Side) -> &mut BTreeMap<i32, u64> {
        match side {
            Side::Buy => &mut self.agg_buy,
            Side::Sell => &mut self.agg_sell,
        }
    }

    /// The visible prefix of one side: the first `min(depth, len)` levels
    /// in ladder order (buys descending, sells ascending).
    pub fn visible(&self, side: Side) -> Vec<Level> {
        match side {
            Side::Buy => self
                .agg_buy
                .iter()
                .rev()
                .take(self.depth)
                .map(|(&price, &volume)| Level { price, volume })
                .collect(),
            Side::Sell => self
                .agg_sell
                .iter()
                .take(self.depth)
                .map(|(&price, &volume)| Level { price, volume })
                .collect(),
        }
    }

    #[inline]
    fn level_add(&mut self, side: Side, price: i32, add: u64) {
        *self.levels_mut(side).entry(price).or_insert(0) += add;
    }

    /// Decrements the aggregate at `price`, removing the level when it
    /// reaches zero. The subtraction saturates: an execute beyond the
    /// level's volume empties it (the feed is trusted to keep add/execute
    /// volumes symmetric).
    #[inline]
    fn level_sub(&mut self, side: Side, price: i32, sub: u64) -> Result<(), BookError> {
        let levels = self.levels_mut(side);
        let Some(cur) = levels.get_mut(&price) else {
            return Err(BookError::InvariantViolation(price));
        };
        *cur = cur.saturating_sub(sub);
        if *cur == 0 {
            levels.remove(&price);
        }
        Ok(())
    }

    /// Rests a new order. Rejects an id that already rests on this side.
    pub fn add(
        &mut self,
        order_id: OrderId,
        side: Side,
        price: i32,
        volume: u64,
    ) -> Result<bool, BookError> {
        if volume == 0 {
            return Err(BookError::ZeroVolume(order_id));
        }
        if self.orders(side).contains_key(&order_id) {
            return Err(BookError::DuplicateOrder(order_id));
        }

        let before = self.visible(side);
        self.level_add(side, price, volume);
        self.orders_mut(side).insert(order_id, Order { price, volume });
        Ok(before != self.visible(side))
    }

    /// Moves an order to a new price and volume. The aggregates see a
    /// removal of the old contribution and an addition of the new one, but
    /// the order record itself is mutated in place.
    pub fn update(
        &mut self,
        order_id: OrderId,
        side: Side,
        price: i32,
        volume: u64,
    ) -> Result<bool, BookError> {
        if volume == 0 {
            return Err(BookError::ZeroVolume(order_id));
        }
        let old = self
            .orders(side)
            .get(&order_id)
            .copied()
            .ok_or(BookError::UnknownOrder(order_id))?;

        let before = self.visible(side);
        self.level_sub(side, old.price, old.volume)?;
        self.level_add(side, price, volume);
        if let Some(o) = self.orders_mut(side).get_mut(&order_id) {
            o.price = price;
            o.volume = volume;
        }
        Ok(before != self.visible(side))
    }

    /// Removes an order and its full contribution to the aggregate.
    pub fn delete(&mut self, order_id: OrderId, side: Side) -> Result<bool, BookError> {
        let old = self
            .orders(side)
            .get(&order_id)
            .copied()
            .ok_or(BookError::UnknownOrder(order_id))?;

        let before = self.visible(side);
        self.level_sub(side, old.price, old.volume)?;
        self.orders_mut(side).remove(&order_id);
        Ok(before != self.visible(side))
    }

    /// Trades `traded_qty` out of an order. The order is removed when its
    /// remaining volume hits zero; over-execution is accepted and removes
    /// it as well.
    pub fn execute(
        &mut self,
        order_id: OrderId,
        side: Side,
        traded_qty: u64,
    ) -> Result<bool, BookError> {
        let old = self
            .orders(side)
            .get(&order_id)
            .copied()
            .ok_or(BookError::UnknownOrder(order_id))?;

        let before = self.visible(side);
        self.level_sub(side, old.price, traded_qty)?;
        let remaining = old.volume.saturating_sub(traded_qty);
        if remaining == 0 {
            self.orders_mut(side).remove(&order_id);
        } else if let Some(o) = self.orders_mut(side).get_mut(&order_id) {
            o.volume = remaining;
        }
        Ok(before != self.visible(side))
    }

    pub fn is_empty(&self) -> bool {
        self.buys.is_empty()
            && self.sells.is_empty()
            && self.agg_buy.is_empty()
            && self.agg_sell.is_empty()
    }
}

impl OrderBook {
    /// Test support: panics unless the full set of book invariants holds.
    pub fn assert_invariants(&self) {
        // no zero-volume levels or orders
        assert!(self.agg_buy.values().all(|&v| v > 0), "zero buy level");
        assert!(self.agg_sell.values().all(|&v| v > 0), "zero sell level");
        assert!(self.buys.values().all(|o| o.volume > 0), "zero volume buy order");
        assert!(self.sells.values().all(|o| o.volume > 0), "zero volume sell order");

        // each aggregate must equal the per-price sum of its orders, and
        // the ladder key set must match the orders' price set exactly
        let mut sum_buy: HashMap<i32, u64> = HashMap::new();
        for o in self.buys.values() {
            *sum_buy.entry(o.price).or_insert(0) += o.volume;
        }
        let mut sum_sell: HashMap<i32, u64> = HashMap::new();
        for o in self.sells.values() {
            *sum_sell.entry(o.price).or_insert(0) += o.volume;
        }

        assert_eq!(self.agg_buy.len(), sum_buy.len(), "buy ladder key set mismatch");
        assert_eq!(self.agg_sell.len(), sum_sell.len(), "sell ladder key set mismatch");
        for (&price, &vol) in self.agg_buy.iter() {
            let exp = sum_buy.get(&price).copied().unwrap_or(0);
            assert_eq!(vol, exp, "buy level volume mismatch at price={price}");
        }
        for (&price, &vol) in self.agg_sell.iter() {
            let exp = sum_sell.get(&price).copied().unwrap_or(0);
            assert_eq!(vol, exp, "sell level volume mismatch at price={price}");
        }
    }
}

/// Registry of per-symbol books. A book is created lazily on the first Add
/// for its symbol and lives for the rest of the session.
pub struct Books {
    depth: usize,
    books: HashMap<Symbol, OrderBook>,
}

impl Books {
    pub fn new(depth: usize) -> Self {
        Self {
            depth,
            books: HashMap::new(),
        }
    }

    #[inline]
    pub fn get(&self, symbol: Symbol) -> Option<&OrderBook> {
        self.books.get(&symbol)
    }

    /// Number of symbols seen so far.
    #[inline]
    pub fn len(&self) -> usize {
        self.books.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    #[inline]
    fn book_mut(&mut self, symbol: Symbol) -> Result<&mut OrderBook, BookError> {
        self.books
            .get_mut(&symbol)
            .ok_or(BookError::UnknownSymbol(symbol))
    }

    pub fn add(
        &mut self,
        symbol: Symbol,
        order_id: OrderId,
        side: Side,
        price: i32,
        volume: u64,
    ) -> Result<bool, BookError> {
        let depth = self.depth;
        self.books
            .entry(symbol)
            .or_insert_with(|| OrderBook::new(depth))
            .add(order_id, side, price, volume)
    }

    pub fn update(
        &mut self,
        symbol: Symbol,
        order_id: OrderId,
        side: Side,
        price: i32,
        volume: u64,
    ) -> Result<bool, BookError> {
        self.book_mut(symbol)?.update(order_id, side, price, volume)
    }

    pub fn delete(
        &mut self,
        symbol: Symbol,
        order_id: OrderId,
        side: Side,
    ) -> Result<bool, BookError> {
        self.book_mut(symbol)?.delete(order_id, side)
    }

    pub fn execute(
        &mut self,
        symbol: Symbol,
        order_id: OrderId,
        side: Side,
        traded_qty: u64,
    ) -> Result<bool, BookError> {
        self.book_mut(symbol)?.execute(order_id, side, traded_qty)
    }

    /// Routes one decoded record body to the matching operation, validating
    /// the side byte on the way in.
    pub fn apply(&mut self, body: &crate::decoder::Body) -> Result<bool, BookError> {
        use crate::decoder::Body;

        match *body {
            Body::Add { symbol, order_id, side, volume, price } => {
                let side = Side::from_wire(side).ok_or(BookError::UnknownSide(side))?;
                self.add(symbol, order_id, side, price, volume)
            }
            Body::Update { symbol, order_id, side, volume, price } => {
                let side = Side::from_wire(side).ok_or(BookError::UnknownSide(side))?;
                self.update(symbol, order_id, side, price, volume)
            }
            Body::Delete { symbol, order_id, side } => {
                let side = Side::from_wire(side).ok_or(BookError::UnknownSide(side))?;
                self.delete(symbol, order_id, side)
            }
            Body::Execute { symbol, order_id, side, traded_qty } => {
                let side = Side::from_wire(side).ok_or(BookError::UnknownSide(side))?;
                self.execute(symbol, order_id, side, traded_qty)
            }
        }
    }
}
