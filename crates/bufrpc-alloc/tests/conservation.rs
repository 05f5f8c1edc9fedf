use bufrpc_alloc::{BitmapAllocator, BlockAllocator, BuddyAllocator};
use proptest::prelude::*;

#[derive(Debug, Clone, Copy)]
enum Op {
    Alloc(usize),
    Free(usize),
}

fn ops() -> impl Strategy<Value = Vec<Op>> {
    prop::collection::vec(
        prop_oneof![
            (1usize..2000).prop_map(Op::Alloc),
            (0usize..16).prop_map(Op::Free),
        ],
        0..64,
    )
}

proptest! {
    #[test]
    fn buddy_conserves_available(ops in ops()) {
        let arena = vec![0u8; 64 * 4096].into_boxed_slice();
        let mut a = BuddyAllocator::new(arena, 64, 4096);
        let initial = a.available();
        let mut live = Vec::new();
        for op in ops {
            match op {
                Op::Alloc(size) => {
                    if let Some(b) = a.alloc(size % 3000) {
                        live.push(b);
                    }
                }
                Op::Free(idx) => {
                    if idx < live.len() {
                        let b = live.swap_remove(idx);
                        a.free(b);
                    }
                }
            }
        }
        for b in live {
            a.free(b);
        }
        prop_assert_eq!(a.available(), initial);
    }

    #[test]
    fn bitmap_conserves_available(ops in ops()) {
        let arena = vec![0u8; 64 * 4096].into_boxed_slice();
        let mut a = BitmapAllocator::new(arena, 4096, 64 * 4096);
        let initial = a.available();
        let mut live = Vec::new();
        for op in ops {
            match op {
                Op::Alloc(size) => {
                    if let Some(b) = a.alloc(size % 3000) {
                        live.push(b);
                    }
                }
                Op::Free(idx) => {
                    if idx < live.len() {
                        let b = live.swap_remove(idx);
                        a.free(b);
                    }
                }
            }
        }
        for b in live {
            a.free(b);
        }
        prop_assert_eq!(a.available(), initial);
    }
}
