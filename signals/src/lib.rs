/*!
Observable values and synchronous broadcast notification.

The cache types in `rowsync-core` expose their state through these primitives: a consumer can
peek at the current value, subscribe to a stream of changes, or simply be told that something changed.

```rust
use rowsync_signals::broadcast::Broadcast;
use std::sync::{Arc, Mutex};

let changes: Broadcast<u32> = Broadcast::new();
let seen = Arc::new(Mutex::new(Vec::new()));
let guard = {
    let seen = seen.clone();
    changes.reference().listen(move |value: u32| seen.lock().unwrap().push(value))
};
changes.send(1);
drop(guard);
changes.send(2);
assert_eq!(*seen.lock().unwrap(), vec![1]);
```
*/

pub mod broadcast;
pub mod porcelain;
mod signal;

pub use porcelain::*;
pub use signal::*;
