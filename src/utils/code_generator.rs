use rand::Rng;

const COUPON_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// 生成折扣券码: 前缀 + 8 位易读字符（去掉 0/O/1/I）
pub fn generate_coupon_code(prefix: &str) -> String {
    let mut rng = rand::thread_rng();
    let body: String = (0..8)
        .map(|_| COUPON_ALPHABET[rng.gen_range(0..COUPON_ALPHABET.len())] as char)
        .collect();
    format!("{prefix}-{body}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_coupon_code_format() {
        let code = generate_coupon_code("MB");
        assert_eq!(code.len(), 11);
        assert!(code.starts_with("MB-"));
        assert!(
            code[3..]
                .bytes()
                .all(|c| COUPON_ALPHABET.contains(&c))
        );
    }

    #[test]
    fn test_generate_multiple_codes() {
        let a = generate_coupon_code("CS");
        let b = generate_coupon_code("CS");
        // 理论上可能相同，这里只确认格式
        assert_eq!(a.len(), b.len());
    }
}
