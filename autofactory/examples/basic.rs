//! Basic example of auto factories and typed factories.
//!
//! Run with `RUST_LOG=autofactory=debug` to see registrations and calls.

use std::sync::Arc;

use autofactory::prelude::*;
use tracing_subscriber::EnvFilter;

// === Services ===

trait Clock: Send + Sync {
    fn now(&self) -> u64;
}

struct FixedClock;

impl Clock for FixedClock {
    fn now(&self) -> u64 {
        1_700_000_000
    }
}

impl Injectable for FixedClock {
    fn construct(_: &dyn Resolver) -> Result<Self> {
        Ok(FixedClock)
    }
}

impl_service!(FixedClock => dyn Clock);

// === Objects built per call ===

trait Order: Send + Sync {
    fn summary(&self) -> String;
}

struct PurchaseOrder {
    clock: Arc<dyn Clock>,
    customer: String,
    coupon: Option<String>,
}

impl Order for PurchaseOrder {
    fn summary(&self) -> String {
        let coupon = self.coupon.as_deref().unwrap_or("none");
        format!("order for {} at {} (coupon: {coupon})", self.customer, self.clock.now())
    }
}

impl Injectable for PurchaseOrder {
    fn construct(r: &dyn Resolver) -> Result<Self> {
        Ok(PurchaseOrder {
            clock: resolve(r)?,
            customer: resolve(r)?,
            coupon: resolve(r)?,
        })
    }
}

impl_service!(PurchaseOrder => dyn Order);

#[typed_factory]
trait OrderFactory: Send + Sync {
    fn open(&self, customer: String, coupon: Option<String>) -> Result<Arc<dyn Order>>;
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let container = Container::new();
    container.register_type::<Arc<dyn Clock>, FixedClock>(Lifetime::ContainerControlled)?;

    // Auto factory: create(customer, coupon)
    container
        .register_auto_factory_for::<Arc<dyn Order>, PurchaseOrder>()?
        .with_params::<String, Option<String>>()?;

    let orders: Arc<dyn Factory2<String, Option<String>, Arc<dyn Order>>> = container.resolve()?;
    println!("{}", orders.create("alice".into(), Some("WELCOME10".into()))?.summary());
    println!("{}", orders.create("bob".into(), None)?.summary());

    // Typed factory bound to the same concrete type
    container
        .register_auto_factory::<dyn OrderFactory, OrderFactoryImpl>()
        .using_concrete_type::<PurchaseOrder>()?;

    let factory: Arc<dyn OrderFactory> = container.resolve()?;
    println!("{}", factory.open("carol".into(), None)?.summary());

    for descriptor in container.factory_descriptors() {
        println!("registered auto factory: {descriptor}");
    }

    Ok(())
}
