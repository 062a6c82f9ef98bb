use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use orderflow_catalog::{
    Customer, CustomerDirectory, InMemoryCustomerDirectory, InMemoryProductDirectory, Product,
    ProductDirectory,
};
use orderflow_core::{CustomerId, ProductId, WarehouseId};
use orderflow_events::InMemoryEventBus;
use orderflow_fulfillment::{FulfillmentEvent, OrderLifecycleController};
use orderflow_orders::{InMemoryOrderStore, OrderItem};
use orderflow_payments::{ApprovingGateway, InMemoryPaymentStore, PaymentRecorder};
use orderflow_reservations::{InMemoryReservationStore, ReservationManager};
use orderflow_stock::{InMemoryStockLedger, StockLedger, StockRecord};

type BenchController = OrderLifecycleController<InMemoryEventBus<FulfillmentEvent>>;

fn build_controller(product_count: usize) -> (Arc<BenchController>, CustomerId, Vec<ProductId>) {
    let ledger = Arc::new(InMemoryStockLedger::new());
    let customers = Arc::new(InMemoryCustomerDirectory::new());
    let products = Arc::new(InMemoryProductDirectory::new());

    let customer_id = CustomerId::new();
    customers.insert(Customer::new(customer_id, "Bench Customer", "bench@example.test").unwrap());

    let warehouse_id = WarehouseId::new();
    let product_ids: Vec<ProductId> = (0..product_count)
        .map(|i| {
            let id = ProductId::new();
            products.insert(Product::new(id, format!("Product {i}"), 100, warehouse_id).unwrap());
            ledger.register(StockRecord {
                product_id: id,
                available: u32::MAX / 2,
                warehouse_id,
            });
            id
        })
        .collect();

    let manager = ReservationManager::new(Arc::new(InMemoryReservationStore::new()), ledger.clone());
    let recorder = PaymentRecorder::new(Arc::new(InMemoryPaymentStore::new()));
    let controller = OrderLifecycleController::new(
        Arc::new(InMemoryOrderStore::new()),
        customers,
        products,
        ledger,
        manager,
        recorder,
        Arc::new(ApprovingGateway::new()),
        Arc::new(InMemoryEventBus::new()),
    );

    (Arc::new(controller), customer_id, product_ids)
}

/// Baseline: the ledger's conditional update alone, without order
/// orchestration around it.
fn bench_ledger_reserve_release(c: &mut Criterion) {
    let ledger = InMemoryStockLedger::new();
    let product_id = ProductId::new();
    ledger.register(StockRecord {
        product_id,
        available: u32::MAX / 2,
        warehouse_id: WarehouseId::new(),
    });

    c.bench_function("ledger_reserve_release", |b| {
        b.iter(|| {
            assert!(ledger.reserve(product_id, black_box(1)).unwrap());
            ledger.release(product_id, 1).unwrap();
        })
    });
}

/// Full pipeline: intake, reservation (ledger + row), cancellation
/// (release + row). Net stock change per iteration is zero.
fn bench_create_reserve_cancel(c: &mut Criterion) {
    let (controller, customer_id, product_ids) = build_controller(1);
    let product_id = product_ids[0];

    c.bench_function("controller_create_reserve_cancel", |b| {
        b.iter(|| {
            let snapshot = controller
                .create_order(
                    customer_id,
                    vec![OrderItem {
                        product_id,
                        quantity: 1,
                        unit_price: 100,
                    }],
                    None,
                )
                .unwrap();
            controller.reserve_order_items(snapshot.id).unwrap();
            controller.cancel_order(snapshot.id).unwrap();
        })
    });
}

/// Reservation cost as the number of order lines grows.
fn bench_reserve_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("reserve_order_items");
    for line_count in [1usize, 4, 8] {
        group.throughput(Throughput::Elements(line_count as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(line_count),
            &line_count,
            |b, &n| {
                let (controller, customer_id, product_ids) = build_controller(n);
                let items: Vec<OrderItem> = product_ids
                    .iter()
                    .map(|&product_id| OrderItem {
                        product_id,
                        quantity: 1,
                        unit_price: 100,
                    })
                    .collect();

                b.iter(|| {
                    let snapshot = controller
                        .create_order(customer_id, items.clone(), None)
                        .unwrap();
                    controller.reserve_order_items(snapshot.id).unwrap();
                    controller.cancel_order(snapshot.id).unwrap();
                });
            },
        );
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_ledger_reserve_release,
    bench_create_reserve_cancel,
    bench_reserve_scaling
);
criterion_main!(benches);
