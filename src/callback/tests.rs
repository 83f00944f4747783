use std::cell::RefCell;
use std::rc::Rc;

use super::Subscribers;

trait Push {
    fn push(&mut self, value: u32);
}

struct Log(Rc<RefCell<Vec<(&'static str, u32)>>>, &'static str);

impl Push for Log {
    fn push(&mut self, value: u32) { self.0.borrow_mut().push((self.1, value)); }
}

#[test]
fn test_notify_in_subscription_order() {
    let events = Rc::new(RefCell::new(Vec::new()));
    let list = Subscribers::<dyn Push>::new();

    let _a = list.subscribe(Rc::new(RefCell::new(Log(Rc::clone(&events), "a"))));
    let b = list.subscribe(Rc::new(RefCell::new(Log(Rc::clone(&events), "b"))));
    let _c = list.subscribe(Rc::new(RefCell::new(Log(Rc::clone(&events), "c"))));

    list.notify(|o| o.push(1));
    assert!(b.cancel());
    list.notify(|o| o.push(2));

    assert_eq!(*events.borrow(), [("a", 1), ("b", 1), ("c", 1), ("a", 2), ("c", 2)]);
    assert_eq!(list.len(), 2);
}

#[test]
fn test_cancel_after_source_dropped() {
    let events = Rc::new(RefCell::new(Vec::new()));
    let list = Subscribers::<dyn Push>::new();
    let sub = list.subscribe(Rc::new(RefCell::new(Log(events, "a"))));

    drop(list);
    assert!(!sub.cancel());
}
