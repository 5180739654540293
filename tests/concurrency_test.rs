use rand::Rng;
use rand::seq::SliceRandom;
use rust_decimal_macros::dec;
use shopbot::application::dispatch::Inbound;
use shopbot::application::payments::SettlementOutcome;
use shopbot::domain::ids::ChatId;
use shopbot::domain::money::Money;
use shopbot::domain::payment::InvoicePayment;

mod common;
use common::{Harness, capture_body, signed_delivery};

const CUSTOMERS: i64 = 24;
const INITIAL_STOCK: i64 = 1_000;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_randomized_settlement_is_exactly_once() {
    let h = Harness::new();
    let products = vec![
        h.seed_product("Mug", dec!(3.50), INITIAL_STOCK).await,
        h.seed_product("Lamp", dec!(19.99), INITIAL_STOCK).await,
        h.seed_product("Rug", dec!(42), INITIAL_STOCK).await,
    ];

    // concurrent cart traffic and checkout
    let mut handles = Vec::new();
    for c in 0..CUSTOMERS {
        let shop = h.shop.clone();
        let picks: Vec<_> = {
            let mut rng = rand::thread_rng();
            (0..rng.gen_range(1..=4))
                .map(|_| (products.choose(&mut rng).unwrap().id, rng.gen_range(1..=3u32)))
                .collect()
        };
        handles.push(tokio::spawn(async move {
            let customer = ChatId(c + 1);
            for (product_id, qty) in picks {
                assert!(shop.ledger.add_to_cart(customer, product_id, qty).await);
            }
            shop.ledger.create_order(customer).await.unwrap()
        }));
    }
    let mut orders = Vec::new();
    for handle in handles {
        orders.push(handle.await.unwrap());
    }

    // each order gets a payment link
    let mut links = Vec::new();
    for order in &orders {
        let link = h
            .shop
            .payments
            .create_payment_link(order.customer_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(link.order_id, order.id);
        links.push(link);
    }

    // every order is confirmed several times over both rails, shuffled
    let mut events = Vec::new();
    for (order, link) in orders.iter().zip(&links) {
        let copies = rand::thread_rng().gen_range(2..=4);
        for _ in 0..copies {
            events.push(Inbound::Webhook(signed_delivery(capture_body(
                &link.payment_id,
            ))));
            events.push(Inbound::InvoicePaid {
                from: order.customer_id,
                payment: InvoicePayment {
                    payload: order.reference().to_string(),
                    currency: "USD".to_string(),
                    total_amount: order.total.to_minor_units().unwrap(),
                },
            });
        }
    }
    let delivered = events.len();
    events.shuffle(&mut rand::thread_rng());

    let handles: Vec<_> = events
        .into_iter()
        .map(|event| {
            let dispatcher = h.dispatcher.clone();
            tokio::spawn(async move { dispatcher.handle(event).await.unwrap().settlement })
        })
        .collect();
    let mut settled = 0;
    let mut duplicates = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Some(SettlementOutcome::Settled { .. }) => settled += 1,
            Some(SettlementOutcome::AlreadySettled { .. }) => duplicates += 1,
            other => panic!("unexpected settlement {other:?}"),
        }
    }
    assert_eq!(settled, orders.len());
    assert_eq!(settled + duplicates, delivered);

    // effects applied exactly once per order
    for order in &orders {
        let customer = h.shop.ledger.customer(order.customer_id).await.unwrap();
        assert_eq!(customer.total_spent, order.total);
        assert!(!h.shop.ledger.order(order.id).await.unwrap().is_pending());
    }
    for product in &products {
        let sold: i64 = orders
            .iter()
            .map(|o| i64::from(o.items.quantity(product.id)))
            .sum();
        let current = h.shop.catalog.get(product.id).await.unwrap();
        assert_eq!(current.stock, INITIAL_STOCK - sold);
    }

    // totals match catalog price times snapshotted quantity
    for order in &orders {
        let recomputed = Money::checked_sum(products.iter().map(|p| {
            p.price.checked_mul(order.items.quantity(p.id)).unwrap()
        }))
        .unwrap();
        assert_eq!(order.total, recomputed);
    }

    let stats = h.shop.ledger.revenue_stats().await;
    let expected = Money::checked_sum(orders.iter().map(|o| o.total)).unwrap();
    assert_eq!(stats.total_orders, orders.len());
    assert_eq!(stats.total_revenue, expected);
    assert_eq!(h.shop.metrics().settled as usize, orders.len());
}
