use crate::kerberos::hash::CrackFormat;

pub fn is_host_port(v: &str) -> Result<String, String> {
    let (host, port) = v
        .rsplit_once(':')
        .ok_or_else(|| format!("Invalid address '{}', must be host:port", v))?;

    if host.trim_matches(|c| c == '[' || c == ']').is_empty() {
        return Err(format!("Invalid address '{}', empty host", v));
    }
    port.parse::<u16>()
        .map_err(|_| format!("Invalid port '{}' in address '{}'", port, v))?;

    Ok(v.to_string())
}

pub fn is_domain(v: &str) -> Result<String, String> {
    let domain = v.trim();
    if domain.is_empty() {
        return Err("Domain must not be empty".to_string());
    }
    if domain.chars().any(char::is_whitespace) {
        return Err(format!("Invalid domain '{}'", v));
    }

    Ok(domain.to_string())
}

pub fn to_crack_format(v: &str) -> Result<CrackFormat, String> {
    v.parse::<CrackFormat>()
}

pub fn is_thread_count(v: &str) -> Result<usize, String> {
    let threads = v.parse::<usize>().map_err(|_| {
        format!("Incorrect value '{}', must be a positive integer", v)
    })?;
    if threads == 0 {
        return Err("At least one thread is required".to_string());
    }

    Ok(threads)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_host_port() {
        assert!(is_host_port("127.0.0.1:1080").is_ok());
        assert!(is_host_port("proxy.local:9050").is_ok());
        assert!(is_host_port("[::1]:1080").is_ok());
        assert!(is_host_port("127.0.0.1").is_err());
        assert!(is_host_port(":1080").is_err());
        assert!(is_host_port("host:99999").is_err());
    }

    #[test]
    fn test_is_thread_count() {
        assert_eq!(is_thread_count("4").unwrap(), 4);
        assert!(is_thread_count("0").is_err());
        assert!(is_thread_count("-1").is_err());
    }

    #[test]
    fn test_is_domain() {
        assert_eq!(is_domain(" example.com ").unwrap(), "example.com");
        assert!(is_domain("").is_err());
        assert!(is_domain("exa mple.com").is_err());
    }
}
