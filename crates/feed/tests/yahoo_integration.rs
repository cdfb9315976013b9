use chrono::FixedOffset;
use orb_core::common::TimeFrame;
use orb_core::market::port::MarketDataProvider;
use orb_feed::yahoo::YahooProvider;

fn provider() -> anyhow::Result<YahooProvider> {
    if rustls::crypto::CryptoProvider::get_default().is_none() {
        // 其他测试可能已安装
        if rustls::crypto::ring::default_provider()
            .install_default()
            .is_err()
        {
            println!("crypto provider already installed");
        }
    }
    let ist = FixedOffset::east_opt(19800).ok_or_else(|| anyhow::anyhow!("bad offset"))?;
    Ok(YahooProvider::new(ist)?)
}

/// # Summary
/// 抓取 NIFTY 当日 5 分钟 K 线。
///
/// # Logic
/// 1. 请求真实接口。
/// 2. 断言每根 K 线的高低点包住开收盘价。
#[tokio::test]
#[ignore = "requires network access"]
async fn test_yahoo_intraday_fetch() -> anyhow::Result<()> {
    let candles = provider()?
        .fetch_intraday("^NSEI", TimeFrame::Minute5)
        .await?;
    for c in &candles {
        assert!(c.low <= c.open.min(c.close));
        assert!(c.high >= c.open.max(c.close));
    }
    println!("Fetched {} intraday candles", candles.len());
    Ok(())
}

#[tokio::test]
#[ignore = "requires network access"]
async fn test_yahoo_volatility_index() -> anyhow::Result<()> {
    let vix = provider()?.fetch_volatility_index("^INDIAVIX").await?;
    assert!(vix > 0.0);
    Ok(())
}

#[tokio::test]
#[ignore = "requires network access"]
async fn test_yahoo_option_chain() -> anyhow::Result<()> {
    let p = provider()?;
    let expiries = p.fetch_expiries("^NSEI").await?;
    let Some(nearest) = expiries.first() else {
        println!("no listed expiries");
        return Ok(());
    };
    let chain = p.fetch_option_chain("^NSEI", *nearest).await?;
    assert!(chain.calls.iter().all(|q| q.expiry == *nearest));
    Ok(())
}
