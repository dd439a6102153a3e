use std::ops::Range;

/// Splits `0..len` into blocks of `block` items and each block into
/// sub-blocks of at most `sub` items. A sub-block never crosses a block
/// boundary. Sizes below 1 are treated as 1.
pub fn sub_blocks(len: usize, block: usize, sub: usize) -> impl Iterator<Item = Range<usize>> {
    let block = block.max(1);
    let sub = sub.max(1);
    (0..len).step_by(block).flat_map(move |start| {
        let end = (start + block).min(len);
        (start..end)
            .step_by(sub)
            .map(move |s| s..(s + sub).min(end))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ten_by_three_by_two() {
        let r: Vec<_> = sub_blocks(10, 3, 2).collect();
        assert_eq!(r, vec![0..2, 2..3, 3..5, 5..6, 6..8, 8..9, 9..10]);
    }

    #[test]
    fn covers_every_index_once() {
        for len in 0..20 {
            for block in 0..6 {
                for sub in 0..6 {
                    let flat: Vec<usize> = sub_blocks(len, block, sub).flatten().collect();
                    assert_eq!(flat, (0..len).collect::<Vec<_>>());
                    assert!(sub_blocks(len, block, sub).all(|r| !r.is_empty()));
                }
            }
        }
    }

    #[test]
    fn sub_larger_than_block() {
        let r: Vec<_> = sub_blocks(5, 2, 8).collect();
        assert_eq!(r, vec![0..2, 2..4, 4..5]);
    }
}
