//! Ordering properties over randomly sized stacks.

use std::sync::{Arc, Mutex};

use proptest::prelude::*;
use relay::{Descriptor, Dispatcher, Error, Handler, Request, Response};

type Log = Arc<Mutex<Vec<usize>>>;

/// Position `i` records itself, then either answers or delegates.
fn stack(len: usize, answer_at: Option<usize>, log: &Log) -> Vec<Descriptor> {
    (0..len)
        .map(|i| {
            let log = Arc::clone(log);
            let answers = answer_at == Some(i);
            Descriptor::function(move |req: Request, next: &dyn Handler| {
                log.lock().unwrap().push(i);
                if answers {
                    Ok(Response::text(i.to_string()))
                } else {
                    next.handle(req)
                }
            })
        })
        .collect()
}

proptest! {
    #[test]
    fn delegating_stacks_run_in_order_then_exhaust(len in 1usize..32) {
        let log = Log::default();
        let app = Dispatcher::new(stack(len, None, &log)).unwrap();

        let result = app.handle(Request::get("/"));

        prop_assert!(matches!(result, Err(Error::StackExhausted)));
        prop_assert_eq!(log.lock().unwrap().clone(), (0..len).collect::<Vec<_>>());
    }

    #[test]
    fn nothing_after_the_answering_position_runs(
        (len, k) in (1usize..32).prop_flat_map(|len| (Just(len), 0..len)),
    ) {
        let log = Log::default();
        let app = Dispatcher::new(stack(len, Some(k), &log)).unwrap();

        let res = app.handle(Request::get("/")).unwrap();
        let expected = k.to_string();

        prop_assert_eq!(res.body().as_ref(), expected.as_bytes());
        prop_assert_eq!(log.lock().unwrap().clone(), (0..=k).collect::<Vec<_>>());
    }

    #[test]
    fn nesting_preserves_order(outer_len in 0usize..8, inner_len in 1usize..8) {
        let log = Log::default();
        let inner = Dispatcher::new(
            (0..inner_len)
                .map(|i| {
                    let log = Arc::clone(&log);
                    Descriptor::function(move |req: Request, next: &dyn Handler| {
                        log.lock().unwrap().push(100 + i);
                        next.handle(req)
                    })
                })
                .collect(),
        )
        .unwrap();

        let mut outer = vec![Descriptor::from(inner)];
        outer.extend(stack(outer_len + 1, Some(outer_len), &log));
        let app = Dispatcher::new(outer).unwrap();

        app.handle(Request::get("/")).unwrap();

        let expected: Vec<usize> = (0..inner_len).map(|i| 100 + i).chain(0..=outer_len).collect();
        prop_assert_eq!(log.lock().unwrap().clone(), expected);
    }
}
