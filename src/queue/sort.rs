//! Merge sort over raw chains
//!
//! These functions relink existing nodes only; nothing is allocated or
//! released. They know nothing about the queue's tail, which the caller
//! recomputes afterwards.
//!
//! Every function here takes chains it owns exclusively: each link must
//! point at a live node produced by `Node::into_link`, reachable from no
//! other chain and not borrowed anywhere else for the duration of the call.

use crate::queue::node::Link;

/// Sort a chain into ascending byte-wise order, keeping equal values in
/// their original relative order.
///
/// # Safety
///
/// `list` must be an exclusively owned chain, see the module docs.
pub(crate) unsafe fn merge_sort(list: Link) -> Link {
    match list {
        Some(head) if (*head.as_ptr()).next.is_some() => {
            let (front, back) = split(list);
            merge(merge_sort(front), merge_sort(back))
        }
        _ => list,
    }
}

/// Split a chain into its front and back halves, the front taking the
/// middle node of an odd-length chain. A chain of length <= 1 splits into
/// itself and an empty chain.
///
/// Tortoise-and-hare walk: the hare moves two links per step and the
/// tortoise one, so when the hare runs off the end the tortoise sits on the
/// last node of the front half.
///
/// # Safety
///
/// `list` must be an exclusively owned chain, see the module docs.
pub(crate) unsafe fn split(list: Link) -> (Link, Link) {
    let Some(head) = list else {
        return (None, None);
    };

    let mut tortoise = head;
    let mut hare = (*head.as_ptr()).next;

    while let Some(node) = hare {
        hare = (*node.as_ptr()).next;
        if let Some(node) = hare {
            hare = (*node.as_ptr()).next;
            if let Some(next) = (*tortoise.as_ptr()).next {
                tortoise = next;
            }
        }
    }

    let back = (*tortoise.as_ptr()).next.take();
    (Some(head), back)
}

/// Merge two sorted chains, taking from `a` on ties.
///
/// # Safety
///
/// `a` and `b` must be disjoint, exclusively owned chains, see the module
/// docs.
pub(crate) unsafe fn merge(mut a: Link, mut b: Link) -> Link {
    let mut head: Link = None;
    let mut last: Link = None;

    while let (Some(left), Some(right)) = (a, b) {
        let node = if (*left.as_ptr()).value <= (*right.as_ptr()).value {
            a = (*left.as_ptr()).next;
            left
        } else {
            b = (*right.as_ptr()).next;
            right
        };

        match last {
            Some(last) => (*last.as_ptr()).next = Some(node),
            None => head = Some(node),
        }
        last = Some(node);
    }

    let rest = a.or(b);
    match last {
        Some(last) => (*last.as_ptr()).next = rest,
        None => head = rest,
    }
    head
}
